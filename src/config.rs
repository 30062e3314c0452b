use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AGENT_CAPTURE_POINTS, AGENT_HOMES, AGENT_RELEASE_PELLETS, AGENT_RELEASE_SECS, AGENT_SPEED,
    ALIGNMENT_TOLERANCE, AMBUSH_TILES_AHEAD, CAPTURE_RADIUS, COLLISION_BUFFER, DASH_ACTIVE_SECS,
    DASH_COOLDOWN_SECS, DASH_TILES, DEFAULT_LAYOUT, EATEN_SPEED_MULTIPLIER, ENTITY_RADIUS,
    FRIGHTENED_SPEED_MULTIPLIER, GAME_OVER_DELAY_SECS, HOME_TOLERANCE, HOUSE_SPEED_MULTIPLIER,
    INVULNERABLE_SECS, MODE_SCHEDULE, PELLET_POINTS, PINCER_TILES_AHEAD, PLAYER_SPEED,
    POWER_PELLET_POINTS, POWER_UP_SECS, PVP_CAPTURE_POINTS, PVP_RADIUS, RE_RELEASE_SECS,
    SHY_DISTANCE_TILES, SLOT_COLORS, STARTING_LIVES, TICK_RATE, TILE_SIZE,
};
use crate::error::ConfigError;
use crate::maze::Maze;
use crate::types::{AgentKind, AgentMode, Vec2};

/// One entry of the global scatter/chase cycle. `duration_secs: None` never ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModePhase {
    pub duration_secs: Option<f32>,
    pub mode: AgentMode,
}

/// Every tunable of a match. Speeds are pixels per second, durations seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub tick_rate: u32,
    pub tile_size: f32,

    pub player_speed: f32,
    pub agent_speed: f32,
    pub frightened_speed_multiplier: f32,
    pub eaten_speed_multiplier: f32,
    pub house_speed_multiplier: f32,

    pub entity_radius: f32,
    pub collision_buffer: f32,
    pub alignment_tolerance: f32,
    pub capture_radius: f32,
    pub pvp_radius: f32,
    pub home_tolerance: f32,

    pub power_up_secs: f32,
    pub invulnerable_secs: f32,
    pub dash_active_secs: f32,
    pub dash_cooldown_secs: f32,
    pub re_release_secs: f32,
    pub game_over_delay_secs: f32,
    pub dash_tiles: i32,

    pub pellet_points: u32,
    pub power_pellet_points: u32,
    pub agent_capture_points: u32,
    pub pvp_capture_points: u32,
    pub starting_lives: u32,

    pub ambush_tiles_ahead: i32,
    pub pincer_tiles_ahead: i32,
    pub shy_distance_tiles: f32,

    /// One lobby slot per color.
    pub slot_colors: Vec<String>,
    pub mode_schedule: Vec<ModePhase>,
    pub agent_homes: Vec<Vec2>,
    pub agent_release_secs: Vec<f32>,
    pub agent_release_pellets: Vec<u32>,
    pub layout: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            tile_size: TILE_SIZE,
            player_speed: PLAYER_SPEED,
            agent_speed: AGENT_SPEED,
            frightened_speed_multiplier: FRIGHTENED_SPEED_MULTIPLIER,
            eaten_speed_multiplier: EATEN_SPEED_MULTIPLIER,
            house_speed_multiplier: HOUSE_SPEED_MULTIPLIER,
            entity_radius: ENTITY_RADIUS,
            collision_buffer: COLLISION_BUFFER,
            alignment_tolerance: ALIGNMENT_TOLERANCE,
            capture_radius: CAPTURE_RADIUS,
            pvp_radius: PVP_RADIUS,
            home_tolerance: HOME_TOLERANCE,
            power_up_secs: POWER_UP_SECS,
            invulnerable_secs: INVULNERABLE_SECS,
            dash_active_secs: DASH_ACTIVE_SECS,
            dash_cooldown_secs: DASH_COOLDOWN_SECS,
            re_release_secs: RE_RELEASE_SECS,
            game_over_delay_secs: GAME_OVER_DELAY_SECS,
            dash_tiles: DASH_TILES,
            pellet_points: PELLET_POINTS,
            power_pellet_points: POWER_PELLET_POINTS,
            agent_capture_points: AGENT_CAPTURE_POINTS,
            pvp_capture_points: PVP_CAPTURE_POINTS,
            starting_lives: STARTING_LIVES,
            ambush_tiles_ahead: AMBUSH_TILES_AHEAD,
            pincer_tiles_ahead: PINCER_TILES_AHEAD,
            shy_distance_tiles: SHY_DISTANCE_TILES,
            slot_colors: SLOT_COLORS.iter().map(|color| color.to_string()).collect(),
            mode_schedule: MODE_SCHEDULE
                .iter()
                .map(|&(duration_secs, mode)| ModePhase {
                    duration_secs,
                    mode,
                })
                .collect(),
            agent_homes: AGENT_HOMES.iter().map(|&(x, y)| Vec2::new(x, y)).collect(),
            agent_release_secs: AGENT_RELEASE_SECS.to_vec(),
            agent_release_pellets: AGENT_RELEASE_PELLETS.to_vec(),
            layout: DEFAULT_LAYOUT.iter().map(|row| row.to_string()).collect(),
        }
    }
}

impl GameConfig {
    /// Defaults, optionally overridden by a JSON file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&raw)?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Fixed simulated duration of one tick.
    pub fn tick_secs(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn lobby_size(&self) -> usize {
        self.slot_colors.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tickRate must be positive".into()));
        }
        if self.tile_size <= 0.0 || self.player_speed < 0.0 || self.agent_speed < 0.0 {
            return Err(ConfigError::Invalid(
                "tileSize must be positive and speeds non-negative".into(),
            ));
        }
        if self.slot_colors.is_empty() {
            return Err(ConfigError::Invalid("at least one lobby slot is required".into()));
        }
        if self.starting_lives == 0 {
            return Err(ConfigError::Invalid("startingLives must be at least 1".into()));
        }
        if self.dash_tiles <= 0 {
            return Err(ConfigError::Invalid("dashTiles must be positive".into()));
        }
        let Some((last, rest)) = self.mode_schedule.split_last() else {
            return Err(ConfigError::Invalid("modeSchedule must not be empty".into()));
        };
        for phase in self.mode_schedule.iter() {
            if !matches!(phase.mode, AgentMode::Scatter | AgentMode::Chase) {
                return Err(ConfigError::Invalid(
                    "modeSchedule may only contain scatter and chase".into(),
                ));
            }
        }
        if rest.iter().any(|phase| phase.duration_secs.is_none()) || last.duration_secs.is_some() {
            return Err(ConfigError::Invalid(
                "only the final modeSchedule entry may be unbounded, and it must be".into(),
            ));
        }
        let agents = self.agent_homes.len();
        if agents == 0 || agents > AgentKind::ROSTER.len() {
            return Err(ConfigError::Invalid(format!(
                "agentHomes must list 1..={} homes",
                AgentKind::ROSTER.len()
            )));
        }
        if self.agent_release_secs.len() != agents || self.agent_release_pellets.len() != agents {
            return Err(ConfigError::Invalid(
                "agent release lists must match agentHomes".into(),
            ));
        }

        let maze = Maze::parse(&self.layout, self.tile_size)?;
        if maze.spawns().len() < self.lobby_size() {
            return Err(ConfigError::Invalid(format!(
                "layout has {} spawns for {} lobby slots",
                maze.spawns().len(),
                self.lobby_size()
            )));
        }
        if let Some(home) = self
            .agent_homes
            .iter()
            .find(|home| maze.is_wall(home.x, home.y))
        {
            return Err(ConfigError::Invalid(format!(
                "agent home ({}, {}) is a wall",
                home.x, home.y
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lobby_size(), 4);
        assert!((config.tick_secs() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config = GameConfig::from_json(r#"{"tickRate":30,"startingLives":5}"#)
            .expect("partial config should parse");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.starting_lives, 5);
        assert_eq!(config.dash_tiles, DASH_TILES);
    }

    #[test]
    fn schedule_must_end_unbounded() {
        let mut config = GameConfig::default();
        config.mode_schedule = vec![ModePhase {
            duration_secs: Some(5.0),
            mode: AgentMode::Scatter,
        }];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn schedule_rejects_non_pursuit_modes() {
        let mut config = GameConfig::default();
        config.mode_schedule = vec![ModePhase {
            duration_secs: None,
            mode: AgentMode::Frightened,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let config = GameConfig {
            tick_rate: 0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn players_must_start_with_a_life() {
        let config = GameConfig {
            starting_lives: 0,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let config = GameConfig::from_json(r#"{"startingLives":0}"#).expect("config parses");
        assert!(config.validate().is_err());
    }

    #[test]
    fn dash_distance_must_be_positive() {
        for dash_tiles in [0, -2] {
            let config = GameConfig {
                dash_tiles,
                ..GameConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn layout_needs_a_spawn_per_slot() {
        let config = GameConfig {
            layout: vec!["#####".into(), "#1 .#".into(), "#####".into()],
            agent_homes: vec![Vec2::new(2, 1)],
            agent_release_secs: vec![0.0],
            agent_release_pellets: vec![0],
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = GameConfig {
            slot_colors: vec!["red".into()],
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn agent_home_inside_wall_is_rejected() {
        let mut config = GameConfig::default();
        config.agent_homes[0] = Vec2::new(0, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = GameConfig::load(Some(Path::new("/nonexistent/maze-chase.json")))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("/nonexistent/maze-chase.json"));
    }
}
