use crate::types::AgentMode;

pub const TICK_RATE: u32 = 60;
pub const TILE_SIZE: f32 = 30.0;

pub const PLAYER_SPEED: f32 = 120.0;
pub const AGENT_SPEED: f32 = 110.0;
pub const FRIGHTENED_SPEED_MULTIPLIER: f32 = 0.5;
pub const EATEN_SPEED_MULTIPLIER: f32 = 2.0;
pub const HOUSE_SPEED_MULTIPLIER: f32 = 0.5;

/// Half extent of the square used for wall tests, in pixels.
pub const ENTITY_RADIUS: f32 = TILE_SIZE / 2.0;
pub const COLLISION_BUFFER: f32 = 1.0;
pub const ALIGNMENT_TOLERANCE: f32 = 4.0;
pub const CAPTURE_RADIUS: f32 = TILE_SIZE * 0.75;
pub const PVP_RADIUS: f32 = TILE_SIZE * 0.75;
pub const HOME_TOLERANCE: f32 = 2.0;

pub const POWER_UP_SECS: f32 = 8.0;
pub const INVULNERABLE_SECS: f32 = 3.0;
pub const DASH_ACTIVE_SECS: f32 = 0.25;
pub const DASH_COOLDOWN_SECS: f32 = 3.0;
pub const RE_RELEASE_SECS: f32 = 2.0;
pub const GAME_OVER_DELAY_SECS: f32 = 5.0;
pub const DASH_TILES: i32 = 3;

pub const PELLET_POINTS: u32 = 10;
pub const POWER_PELLET_POINTS: u32 = 50;
pub const AGENT_CAPTURE_POINTS: u32 = 200;
pub const PVP_CAPTURE_POINTS: u32 = 300;
pub const STARTING_LIVES: u32 = 3;

pub const AMBUSH_TILES_AHEAD: i32 = 4;
pub const PINCER_TILES_AHEAD: i32 = 2;
pub const SHY_DISTANCE_TILES: f32 = 8.0;

pub const MIN_GAME_SPEED: f32 = 0.25;
pub const MAX_GAME_SPEED: f32 = 4.0;

pub const SLOT_COLORS: [&str; 4] = ["#ffeb3b", "#4caf50", "#e040fb", "#ff9800"];
pub const OBSERVER_COLOR: &str = "#9e9e9e";

/// Classic alternation; `None` duration marks the final, unbounded entry.
pub const MODE_SCHEDULE: [(Option<f32>, AgentMode); 8] = [
    (Some(7.0), AgentMode::Scatter),
    (Some(20.0), AgentMode::Chase),
    (Some(7.0), AgentMode::Scatter),
    (Some(20.0), AgentMode::Chase),
    (Some(5.0), AgentMode::Scatter),
    (Some(20.0), AgentMode::Chase),
    (Some(5.0), AgentMode::Scatter),
    (None, AgentMode::Chase),
];

pub const AGENT_RELEASE_SECS: [f32; 4] = [0.0, 3.0, 8.0, 14.0];
pub const AGENT_RELEASE_PELLETS: [u32; 4] = [0, 10, 30, 60];

pub const DEFAULT_LAYOUT: [&str; 20] = [
    "####################",
    "#1.......##.......2#",
    "#.##.###.##.###.##.#",
    "#o##.###.##.###.##o#",
    "#..................#",
    "#.##.#.######.#.##.#",
    "#....#.######.#....#",
    "####.#        #.####",
    "####.# ##==## #.####",
    "    .  #HHHH#  .    ",
    "####.# #HHHH# #.####",
    "####.# ###### #.####",
    "####.# ###### #.####",
    "#........##........#",
    "#.##.###.##.###.##.#",
    "#o.......  .......o#",
    "#.##.#.######.#.##.#",
    "#.##.#.######.#.##.#",
    "#3................4#",
    "####################",
];

pub const AGENT_HOMES: [(i32, i32); 4] = [(9, 9), (10, 9), (8, 10), (11, 10)];
