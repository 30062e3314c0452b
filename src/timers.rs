use crate::config::ModePhase;
use crate::types::AgentMode;

/// A countdown advanced only by simulated tick time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn start(secs: f32) -> Self {
        let mut timer = Self::default();
        timer.arm(secs);
        timer
    }

    pub fn arm(&mut self, secs: f32) {
        self.remaining = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    }

    /// Re-arms only if that lengthens the countdown.
    pub fn extend_to(&mut self, secs: f32) {
        if secs > self.remaining {
            self.arm(secs);
        }
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Returns `true` exactly once, on the tick that reaches zero. Negative or
    /// non-finite `dt` counts as zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.remaining = (self.remaining - dt).max(0.0);
        self.remaining == 0.0
    }
}

/// The global scatter/chase cycle.
#[derive(Clone, Debug)]
pub struct ModeSchedule {
    phases: Vec<ModePhase>,
    index: usize,
    timer: Countdown,
}

impl ModeSchedule {
    pub fn new(phases: Vec<ModePhase>) -> Self {
        let mut schedule = Self {
            phases,
            index: 0,
            timer: Countdown::default(),
        };
        schedule.restart();
        schedule
    }

    pub fn restart(&mut self) {
        self.index = 0;
        self.arm_current();
    }

    fn arm_current(&mut self) {
        let secs = self
            .phases
            .get(self.index)
            .and_then(|phase| phase.duration_secs)
            .unwrap_or(0.0);
        self.timer.arm(secs);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_mode(&self) -> AgentMode {
        self.phases
            .get(self.index)
            .map(|phase| phase.mode)
            .unwrap_or(AgentMode::Chase)
    }

    /// `None` once the unbounded final entry is reached.
    pub fn remaining(&self) -> Option<f32> {
        self.phases
            .get(self.index)
            .and_then(|phase| phase.duration_secs)
            .map(|_| self.timer.remaining())
    }

    /// Returns the newly adopted mode when an entry boundary is crossed.
    pub fn tick(&mut self, dt: f32) -> Option<AgentMode> {
        let bounded = self
            .phases
            .get(self.index)
            .map(|phase| phase.duration_secs.is_some())
            .unwrap_or(false);
        if !bounded || self.index + 1 >= self.phases.len() {
            return None;
        }
        let expired = self.timer.tick(dt);
        if !expired && self.timer.is_running() {
            return None;
        }
        self.index += 1;
        self.arm_current();
        Some(self.current_mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(duration_secs: Option<f32>, mode: AgentMode) -> ModePhase {
        ModePhase {
            duration_secs,
            mode,
        }
    }

    #[test]
    fn countdown_fires_once_at_zero() {
        let mut timer = Countdown::start(0.05);
        assert!(!timer.tick(0.03));
        assert!(timer.tick(0.03));
        assert_eq!(timer.remaining(), 0.0);
        assert!(!timer.tick(0.03));
        assert!(!timer.is_running());
    }

    #[test]
    fn countdown_ignores_negative_and_nan_dt() {
        let mut timer = Countdown::start(1.0);
        assert!(!timer.tick(-5.0));
        assert!(!timer.tick(f32::NAN));
        assert_eq!(timer.remaining(), 1.0);
        assert!(!timer.tick(0.0));
    }

    #[test]
    fn extend_to_never_shortens() {
        let mut timer = Countdown::start(5.0);
        timer.extend_to(2.0);
        assert_eq!(timer.remaining(), 5.0);
        timer.extend_to(8.0);
        assert_eq!(timer.remaining(), 8.0);
    }

    #[test]
    fn schedule_advances_and_stops_at_unbounded_entry() {
        let mut schedule = ModeSchedule::new(vec![
            phase(Some(0.1), AgentMode::Scatter),
            phase(Some(0.1), AgentMode::Chase),
            phase(None, AgentMode::Scatter),
        ]);
        assert_eq!(schedule.current_mode(), AgentMode::Scatter);
        assert_eq!(schedule.tick(0.05), None);
        assert_eq!(schedule.tick(0.05), Some(AgentMode::Chase));
        assert_eq!(schedule.index(), 1);
        assert_eq!(schedule.tick(0.1), Some(AgentMode::Scatter));
        assert_eq!(schedule.remaining(), None);
        for _ in 0..100 {
            assert_eq!(schedule.tick(1.0), None);
        }
        schedule.restart();
        assert_eq!(schedule.index(), 0);
        assert_eq!(schedule.current_mode(), AgentMode::Scatter);
    }
}
