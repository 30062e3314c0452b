use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    #[default]
    None,
}

impl Direction {
    /// Tie-break order for agent decisions.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    pub fn from_delta(dx: i64, dy: i64) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            (0, 0) => Some(Self::None),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (dx, dy) = self.delta();
        let mut state = serializer.serialize_struct("Direction", 2)?;
        state.serialize_field("dx", &dx)?;
        state.serialize_field("dy", &dy)?;
        state.end()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction, tiles: i32) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx * tiles,
            y: self.y + dy * tiles,
        }
    }

    pub fn distance_sq(self, other: Vec2) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileKind {
    Empty,
    Wall,
    Pellet,
    PowerPellet,
    Consumed,
}

impl TileKind {
    /// Numeric code understood by the renderer.
    pub fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Wall => 1,
            Self::Pellet => 2,
            Self::PowerPellet => 3,
            Self::Consumed => 4,
        }
    }

    pub fn is_pellet(self) -> bool {
        matches!(self, Self::Pellet | Self::PowerPellet)
    }
}

impl Serialize for TileKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Spectating,
    Observer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    InHouse,
    ExitingHouse,
    Scatter,
    Chase,
    Frightened,
    Eaten,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Chaser,
    Ambusher,
    Pincer,
    Shy,
}

impl AgentKind {
    pub const ROSTER: [AgentKind; 4] = [
        AgentKind::Chaser,
        AgentKind::Ambusher,
        AgentKind::Pincer,
        AgentKind::Shy,
    ];

    pub fn color(self) -> &'static str {
        match self {
            Self::Chaser => "red",
            Self::Ambusher => "pink",
            Self::Pincer => "cyan",
            Self::Shy => "orange",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: u32,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub score: u32,
    pub lives: u32,
    pub status: PlayerStatus,
    pub is_active: bool,
    pub is_spectator: bool,
    pub is_winner: bool,
    pub is_powered_up: bool,
    pub power_up_timer: f32,
    pub is_invulnerable: bool,
    pub invulnerability_timer: f32,
    pub is_dashing: bool,
    pub dash_cooldown: f32,
    pub dash_available: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub id: u32,
    pub kind: AgentKind,
    pub color: &'static str,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub mode: AgentMode,
    pub frightened: bool,
    pub eaten: bool,
    pub target_player_id: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tick: u64,
    pub width: i32,
    pub height: i32,
    pub tile_size: f32,
    pub map: Vec<Vec<TileKind>>,
    pub pellets_remaining: u32,
    pub mode: AgentMode,
    pub frightened_timer: f32,
    pub is_game_over: bool,
    pub game_over_timer: f32,
    pub winners: Vec<u32>,
    pub players: Vec<PlayerView>,
    #[serde(rename = "ghosts")]
    pub agents: Vec<AgentView>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySlotView {
    pub id: usize,
    pub joined: bool,
    pub client_id: Option<String>,
    pub color: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LobbyState {
    pub slots: Vec<LobbySlotView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StartPlayer {
    pub slot: usize,
    pub client_id: String,
    pub color: String,
}
