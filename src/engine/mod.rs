use crate::config::GameConfig;
use crate::error::ConfigError;
use crate::maze::Maze;
use crate::rng::Rng;
use crate::timers::{Countdown, ModeSchedule};
use crate::types::{
    AgentKind, AgentMode, AgentView, Direction, PlayerStatus, PlayerView, Position, Snapshot,
    StartPlayer, TileKind, Vec2,
};

mod agents;
mod collision;
mod movement;

#[derive(Clone, Debug)]
struct Player {
    id: u32,
    client_id: Option<String>,
    color: String,
    spawn: Vec2,
    pos: Position,
    dir: Direction,
    last_dir: Direction,
    queued_dir: Option<Direction>,
    dash_requested: bool,
    status: PlayerStatus,
    power_up: Countdown,
    invulnerable: Countdown,
    dashing: Countdown,
    dash_cooldown: Countdown,
    score: u32,
    lives: u32,
    winner: bool,
}

impl Player {
    fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    fn heading(&self) -> Direction {
        if self.dir.is_none() {
            self.last_dir
        } else {
            self.dir
        }
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: u32,
    kind: AgentKind,
    home: Vec2,
    pos: Position,
    dir: Direction,
    mode: AgentMode,
    release: Countdown,
    release_pellets: Option<u32>,
    initial_release_secs: f32,
    initial_release_pellets: u32,
    last_decision: Option<Vec2>,
    target_player: Option<u32>,
}

impl Agent {
    fn reverse(&mut self) {
        self.dir = self.dir.opposite();
        self.last_decision = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum MatchPhase {
    Running,
    GameOver(Countdown),
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    config: GameConfig,
    maze: Maze,
    players: Vec<Player>,
    agents: Vec<Agent>,
    frightened: Countdown,
    schedule: ModeSchedule,
    phase: MatchPhase,
    pellets_since_reset: u32,
    rng: Rng,
    tick_counter: u64,
    finished: bool,
}

impl GameEngine {
    pub fn new(
        config: &GameConfig,
        start_players: Vec<StartPlayer>,
        seed: u32,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let maze = Maze::parse(&config.layout, config.tile_size)?;
        Ok(Self::with_maze(config, maze, start_players, seed))
    }

    pub fn with_maze(
        config: &GameConfig,
        maze: Maze,
        start_players: Vec<StartPlayer>,
        seed: u32,
    ) -> Self {
        let players = start_players
            .into_iter()
            .map(|start| {
                let spawn = maze
                    .spawns()
                    .get(start.slot % maze.spawns().len().max(1))
                    .copied()
                    .unwrap_or(Vec2::new(1, 1));
                Player {
                    id: start.slot as u32 + 1,
                    client_id: Some(start.client_id),
                    color: start.color,
                    spawn,
                    pos: maze.tile_center(spawn),
                    dir: Direction::None,
                    last_dir: Direction::None,
                    queued_dir: None,
                    dash_requested: false,
                    status: PlayerStatus::Active,
                    power_up: Countdown::default(),
                    invulnerable: Countdown::default(),
                    dashing: Countdown::default(),
                    dash_cooldown: Countdown::default(),
                    score: 0,
                    lives: config.starting_lives,
                    winner: false,
                }
            })
            .collect();

        let agents = config
            .agent_homes
            .iter()
            .zip(AgentKind::ROSTER)
            .enumerate()
            .map(|(idx, (&home, kind))| {
                let release_secs = config.agent_release_secs.get(idx).copied().unwrap_or(0.0);
                let release_pellets = config.agent_release_pellets.get(idx).copied().unwrap_or(0);
                Agent {
                    id: idx as u32 + 1,
                    kind,
                    home,
                    pos: maze.tile_center(home),
                    dir: Direction::None,
                    mode: AgentMode::InHouse,
                    release: Countdown::start(release_secs),
                    release_pellets: Some(release_pellets),
                    initial_release_secs: release_secs,
                    initial_release_pellets: release_pellets,
                    last_decision: None,
                    target_player: None,
                }
            })
            .collect();

        Self {
            schedule: ModeSchedule::new(config.mode_schedule.clone()),
            config: config.clone(),
            maze,
            players,
            agents,
            frightened: Countdown::default(),
            phase: MatchPhase::Running,
            pellets_since_reset: 0,
            rng: Rng::new(seed),
            tick_counter: 0,
            finished: false,
        }
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn pellets_remaining(&self) -> u32 {
        self.maze.pellets_remaining()
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, MatchPhase::GameOver(_))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn winners(&self) -> Vec<u32> {
        self.players
            .iter()
            .filter(|player| player.winner)
            .map(|player| player.id)
            .collect()
    }

    pub fn active_player_count(&self) -> usize {
        self.players.iter().filter(|player| player.is_active()).count()
    }

    pub fn player_id_for_client(&self, client_id: &str) -> Option<u32> {
        self.players
            .iter()
            .find(|player| player.client_id.as_deref() == Some(client_id))
            .map(|player| player.id)
    }

    fn player_index(&self, player_id: u32) -> Option<usize> {
        self.players.iter().position(|player| player.id == player_id)
    }

    /// Replaces the queued turn. A zero direction cancels it.
    pub fn queue_move(&mut self, player_id: u32, dir: Direction) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        let player = &mut self.players[idx];
        if !player.is_active() {
            return false;
        }
        player.queued_dir = if dir.is_none() { None } else { Some(dir) };
        true
    }

    pub fn queue_dash(&mut self, player_id: u32) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        let player = &mut self.players[idx];
        if !player.is_active() {
            return false;
        }
        player.dash_requested = true;
        true
    }

    pub fn add_observer(&mut self, client_id: &str) -> u32 {
        let id = self.players.iter().map(|player| player.id).max().unwrap_or(0) + 1;
        let spawn = self.maze.spawns().first().copied().unwrap_or(Vec2::new(1, 1));
        self.players.push(Player {
            id,
            client_id: Some(client_id.to_string()),
            color: crate::constants::OBSERVER_COLOR.to_string(),
            spawn,
            pos: self.maze.tile_center(spawn),
            dir: Direction::None,
            last_dir: Direction::None,
            queued_dir: None,
            dash_requested: false,
            status: PlayerStatus::Observer,
            power_up: Countdown::default(),
            invulnerable: Countdown::default(),
            dashing: Countdown::default(),
            dash_cooldown: Countdown::default(),
            score: 0,
            lives: 0,
            winner: false,
        });
        id
    }

    pub fn detach_player(&mut self, player_id: u32) {
        let Some(idx) = self.player_index(player_id) else {
            return;
        };
        let player = &mut self.players[idx];
        player.client_id = None;
        player.queued_dir = None;
        player.dash_requested = false;
        if player.is_active() {
            player.status = PlayerStatus::Spectating;
            player.dir = Direction::None;
            tracing::info!(player_id, "player disconnected mid-match, now spectating");
        }
    }

    pub fn step(&mut self, dt: f32) {
        if self.finished {
            return;
        }
        self.tick_counter += 1;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if let MatchPhase::GameOver(mut hold) = self.phase {
            self.advance_timers(dt);
            let elapsed = hold.tick(dt) || !hold.is_running();
            self.phase = MatchPhase::GameOver(hold);
            if elapsed {
                self.finished = true;
            }
            return;
        }

        self.advance_timers(dt);
        self.move_players(dt);
        self.update_agents(dt);
        self.resolve_collisions();
        self.check_end_conditions();
    }

    fn advance_timers(&mut self, dt: f32) {
        for player in &mut self.players {
            player.power_up.tick(dt);
            player.invulnerable.tick(dt);
            player.dashing.tick(dt);
            player.dash_cooldown.tick(dt);
        }
        for agent in &mut self.agents {
            agent.release.tick(dt);
        }

        if self.frightened.tick(dt) {
            let mode = self.schedule.current_mode();
            for agent in &mut self.agents {
                if agent.mode == AgentMode::Frightened {
                    agent.mode = mode;
                }
            }
        }

        // The cycle is frozen while the frightened window is open.
        if !self.frightened.is_running() {
            if let Some(mode) = self.schedule.tick(dt) {
                for agent in &mut self.agents {
                    if matches!(agent.mode, AgentMode::Scatter | AgentMode::Chase) {
                        agent.reverse();
                        agent.mode = mode;
                    }
                }
            }
        }
    }

    fn check_end_conditions(&mut self) {
        let participants = self
            .players
            .iter()
            .filter(|player| player.status != PlayerStatus::Observer)
            .count();
        let active = self.active_player_count();

        if self.maze.pellets_remaining() == 0 {
            for player in self.players.iter_mut().filter(|player| player.is_active()) {
                player.winner = true;
            }
            self.enter_game_over("maze cleared");
        } else if participants > 1 && active <= 1 {
            if let Some(survivor) = self.players.iter_mut().find(|player| player.is_active()) {
                survivor.winner = true;
            }
            self.enter_game_over("last player standing");
        } else if participants > 0 && active == 0 {
            self.enter_game_over("no players left");
        }
    }

    fn enter_game_over(&mut self, reason: &str) {
        self.phase = MatchPhase::GameOver(Countdown::start(self.config.game_over_delay_secs));
        for player in &mut self.players {
            player.dir = Direction::None;
            player.queued_dir = None;
            player.dash_requested = false;
        }
        tracing::info!(
            reason,
            winners = ?self.winners(),
            tick = self.tick_counter,
            "match over"
        );
    }

    pub fn snapshot(&self) -> Snapshot {
        let (is_game_over, game_over_timer) = match self.phase {
            MatchPhase::Running => (false, 0.0),
            MatchPhase::GameOver(hold) => (true, hold.remaining()),
        };
        Snapshot {
            tick: self.tick_counter,
            width: self.maze.width(),
            height: self.maze.height(),
            tile_size: self.maze.tile_size(),
            map: self.maze.rows(),
            pellets_remaining: self.maze.pellets_remaining(),
            mode: self.schedule.current_mode(),
            frightened_timer: self.frightened.remaining(),
            is_game_over,
            game_over_timer,
            winners: self.winners(),
            players: self.players.iter().map(player_view).collect(),
            agents: self.agents.iter().map(agent_view).collect(),
        }
    }
}

fn player_view(player: &Player) -> PlayerView {
    PlayerView {
        id: player.id,
        color: player.color.clone(),
        x: player.pos.x,
        y: player.pos.y,
        direction: player.dir,
        score: player.score,
        lives: player.lives,
        status: player.status,
        is_active: player.is_active(),
        is_spectator: !player.is_active(),
        is_winner: player.winner,
        is_powered_up: player.power_up.is_running(),
        power_up_timer: player.power_up.remaining(),
        is_invulnerable: player.invulnerable.is_running(),
        invulnerability_timer: player.invulnerable.remaining(),
        is_dashing: player.dashing.is_running(),
        dash_cooldown: player.dash_cooldown.remaining(),
        dash_available: !player.dash_cooldown.is_running(),
    }
}

fn agent_view(agent: &Agent) -> AgentView {
    AgentView {
        id: agent.id,
        kind: agent.kind,
        color: agent.kind.color(),
        x: agent.pos.x,
        y: agent.pos.y,
        direction: agent.dir,
        mode: agent.mode,
        frightened: agent.mode == AgentMode::Frightened,
        eaten: agent.mode == AgentMode::Eaten,
        target_player_id: agent.target_player,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TILE_SIZE;

    pub(super) fn start(slot: usize) -> StartPlayer {
        StartPlayer {
            slot,
            client_id: format!("client_{}", slot + 1),
            color: "yellow".to_string(),
        }
    }

    pub(super) fn engine_on(rows: &[&str], players: usize) -> GameEngine {
        let config = GameConfig {
            agent_homes: Vec::new(),
            agent_release_secs: Vec::new(),
            agent_release_pellets: Vec::new(),
            ..GameConfig::default()
        };
        let maze = Maze::parse(rows, TILE_SIZE).expect("test layout parses");
        GameEngine::with_maze(&config, maze, (0..players).map(start).collect(), 1)
    }

    pub(super) fn tick_secs() -> f32 {
        GameConfig::default().tick_secs()
    }

    pub(super) fn open_room() -> Vec<String> {
        let mut rows = vec!["#".repeat(20)];
        for y in 1..19 {
            let mut row = String::from("#");
            for x in 1..19 {
                row.push(if (x, y) == (1, 1) { '1' } else if (x, y) == (18, 18) { '2' } else { ' ' });
            }
            row.push('#');
            rows.push(row);
        }
        rows.push("#".repeat(20));
        // keep one pellet so the match does not end on its own
        rows[10].replace_range(10..11, ".");
        rows
    }

    pub(super) fn engine_on_owned(rows: &[String], players: usize) -> GameEngine {
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        engine_on(&refs, players)
    }

    #[test]
    fn default_match_starts_with_players_on_spawns() {
        let config = GameConfig::default();
        let engine = GameEngine::new(&config, vec![start(0), start(3)], 7).expect("engine builds");
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].id, 1);
        assert_eq!(snapshot.players[1].id, 4);
        assert_eq!((snapshot.players[0].x, snapshot.players[0].y), (45.0, 45.0));
        assert_eq!(snapshot.players[1].lives, config.starting_lives);
        assert_eq!(snapshot.agents.len(), 4);
        assert!(snapshot.agents.iter().all(|agent| agent.mode == AgentMode::InHouse));
        assert_eq!(snapshot.pellets_remaining, engine.maze().count_pellet_tiles());
    }

    #[test]
    fn match_refuses_players_without_lives() {
        let config = GameConfig {
            starting_lives: 0,
            ..GameConfig::default()
        };
        assert!(GameEngine::new(&config, vec![start(0)], 7).is_err());
    }

    #[test]
    fn inactive_players_cannot_queue_input() {
        let mut engine = engine_on_owned(&open_room(), 2);
        engine.detach_player(2);
        assert!(!engine.queue_move(2, Direction::Right));
        assert!(!engine.queue_dash(2));
        assert!(!engine.queue_move(99, Direction::Right));
        assert!(engine.queue_move(1, Direction::Right));
    }

    #[test]
    fn zero_move_clears_queued_turn() {
        let mut engine = engine_on_owned(&open_room(), 1);
        assert!(engine.queue_move(1, Direction::Down));
        assert!(engine.queue_move(1, Direction::None));
        assert_eq!(engine.players[0].queued_dir, None);
    }

    #[test]
    fn disconnect_keeps_index_and_ends_two_player_match() {
        let mut engine = engine_on_owned(&open_room(), 2);
        engine.detach_player(1);
        assert_eq!(engine.players.len(), 2);
        assert_eq!(engine.players[0].status, PlayerStatus::Spectating);
        engine.step(tick_secs());
        assert!(engine.is_game_over());
        assert_eq!(engine.winners(), vec![2]);
    }

    #[test]
    fn observers_do_not_count_toward_win_checks() {
        let mut engine = engine_on_owned(&open_room(), 1);
        let observer = engine.add_observer("client_9");
        assert_eq!(observer, 2);
        assert!(!engine.queue_move(observer, Direction::Left));
        engine.step(tick_secs());
        assert!(!engine.is_game_over());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.players[1].status, PlayerStatus::Observer);
        assert!(snapshot.players[1].is_spectator);
    }

    #[test]
    fn clearing_the_maze_makes_active_players_winners() {
        let mut engine = engine_on(&["#####", "#1.2#", "#####"], 2);
        engine.queue_move(1, Direction::Right);
        for _ in 0..30 {
            engine.step(tick_secs());
            if engine.is_game_over() {
                break;
            }
        }
        assert!(engine.is_game_over());
        assert_eq!(engine.pellets_remaining(), 0);
        assert_eq!(engine.winners(), vec![1, 2]);
    }

    #[test]
    fn game_over_holds_then_finishes() {
        let mut engine = engine_on_owned(&open_room(), 2);
        engine.detach_player(2);
        engine.step(tick_secs());
        assert!(engine.is_game_over());
        let position = (engine.players[0].pos.x, engine.players[0].pos.y);
        engine.queue_move(1, Direction::Right);

        let hold_ticks = (engine.config.game_over_delay_secs / tick_secs()).ceil() as usize;
        for _ in 0..hold_ticks - 1 {
            engine.step(tick_secs());
        }
        assert!(!engine.is_finished());
        assert_eq!((engine.players[0].pos.x, engine.players[0].pos.y), position);
        for _ in 0..3 {
            engine.step(tick_secs());
        }
        assert!(engine.is_finished());
    }

    #[test]
    fn timers_tolerate_negative_tick_durations() {
        let mut engine = engine_on_owned(&open_room(), 1);
        engine.players[0].power_up.arm(1.0);
        engine.step(-1.0);
        engine.step(f32::NAN);
        assert_eq!(engine.players[0].power_up.remaining(), 1.0);
    }

    #[test]
    fn snapshot_serializes_renderer_fields() {
        let engine = GameEngine::new(&GameConfig::default(), vec![start(0)], 3).expect("engine builds");
        let value = serde_json::to_value(engine.snapshot()).expect("snapshot serializes");
        assert!(value["map"].is_array());
        assert_eq!(value["map"][0][0], 1);
        assert!(value["pelletsRemaining"].is_u64());
        assert_eq!(value["players"][0]["isActive"], true);
        assert_eq!(value["players"][0]["direction"]["dx"], 0);
        assert!(value["ghosts"][0]["frightened"].is_boolean());
        assert_eq!(value["ghosts"][0]["color"], "red");
        assert_eq!(value["isGameOver"], false);
    }
}
