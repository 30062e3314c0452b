use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::types::{Direction, Position, TileKind, Vec2};

/// Tile grid of one match. Only pellet cells ever change, and only to `Consumed`.
#[derive(Clone, Debug)]
pub struct Maze {
    width: i32,
    height: i32,
    tile_size: f32,
    tiles: Vec<TileKind>,
    enclosure: Vec<bool>,
    spawns: Vec<Vec2>,
    house_exit: Option<Vec2>,
    pellets_remaining: u32,
}

impl Maze {
    /// Parses a text layout: `#` wall, `.` pellet, `o` power pellet, space empty,
    /// `H` agent house, `=` house door, `1`-`9` player spawns.
    pub fn parse<S: AsRef<str>>(rows: &[S], tile_size: f32) -> Result<Self, ConfigError> {
        let height = rows.len();
        let width = rows.first().map(|row| row.as_ref().chars().count()).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(ConfigError::Layout("layout is empty".into()));
        }

        let mut tiles = Vec::with_capacity(width * height);
        let mut enclosure = Vec::with_capacity(width * height);
        let mut spawns = BTreeMap::new();
        let mut house_exit = None;
        let mut pellets_remaining = 0;

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(ConfigError::Layout(format!(
                    "row {y} has {} columns, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, ch) in row.chars().enumerate() {
                let (kind, house) = match ch {
                    '#' => (TileKind::Wall, false),
                    '.' => (TileKind::Pellet, false),
                    'o' => (TileKind::PowerPellet, false),
                    ' ' => (TileKind::Empty, false),
                    'H' => (TileKind::Empty, true),
                    '=' => {
                        if house_exit.is_none() {
                            house_exit = Some(Vec2::new(x as i32, y as i32 - 1));
                        }
                        (TileKind::Empty, true)
                    }
                    '1'..='9' => {
                        spawns.insert(ch, Vec2::new(x as i32, y as i32));
                        (TileKind::Empty, false)
                    }
                    other => {
                        return Err(ConfigError::Layout(format!(
                            "unknown tile '{other}' at ({x}, {y})"
                        )))
                    }
                };
                if kind.is_pellet() {
                    pellets_remaining += 1;
                }
                tiles.push(kind);
                enclosure.push(house);
            }
        }

        let maze = Self {
            width: width as i32,
            height: height as i32,
            tile_size,
            tiles,
            enclosure,
            spawns: spawns.into_values().collect(),
            house_exit,
            pellets_remaining,
        };
        if let Some(exit) = maze.house_exit {
            if maze.blocks_player(exit.x, exit.y) {
                return Err(ConfigError::Layout(format!(
                    "house exit ({}, {}) is not open",
                    exit.x, exit.y
                )));
            }
        }
        Ok(maze)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_size
    }

    pub fn pellets_remaining(&self) -> u32 {
        self.pellets_remaining
    }

    pub fn spawns(&self) -> &[Vec2] {
        &self.spawns
    }

    pub fn house_exit(&self) -> Option<Vec2> {
        self.house_exit
    }

    pub fn wrap_x(&self, tile_x: i32) -> i32 {
        tile_x.rem_euclid(self.width)
    }

    fn index(&self, tile_x: i32, tile_y: i32) -> Option<usize> {
        if tile_y < 0 || tile_y >= self.height {
            return None;
        }
        Some((tile_y * self.width + self.wrap_x(tile_x)) as usize)
    }

    /// Out-of-range rows read as wall; columns wrap.
    pub fn tile(&self, tile_x: i32, tile_y: i32) -> TileKind {
        self.index(tile_x, tile_y)
            .map(|idx| self.tiles[idx])
            .unwrap_or(TileKind::Wall)
    }

    pub fn is_wall(&self, tile_x: i32, tile_y: i32) -> bool {
        self.tile(tile_x, tile_y) == TileKind::Wall
    }

    pub fn is_enclosure(&self, tile_x: i32, tile_y: i32) -> bool {
        self.index(tile_x, tile_y)
            .map(|idx| self.enclosure[idx])
            .unwrap_or(false)
    }

    /// Players never enter the agent house.
    pub fn blocks_player(&self, tile_x: i32, tile_y: i32) -> bool {
        self.is_wall(tile_x, tile_y) || self.is_enclosure(tile_x, tile_y)
    }

    pub fn tile_of(&self, pos: Position) -> Vec2 {
        let x = (pos.x / self.tile_size).floor() as i32;
        let y = (pos.y / self.tile_size).floor() as i32;
        Vec2::new(self.wrap_x(x), y)
    }

    pub fn tile_center(&self, tile: Vec2) -> Position {
        Position::new(
            (self.wrap_x(tile.x) as f32 + 0.5) * self.tile_size,
            (tile.y as f32 + 0.5) * self.tile_size,
        )
    }

    /// Horizontal tunnel wraparound; vertical coordinates are left alone.
    pub fn wrap_position(&self, pos: Position) -> Position {
        Position::new(pos.x.rem_euclid(self.pixel_width()), pos.y)
    }

    /// Samples the corners of the entity's box at its prospective position.
    pub fn would_collide(
        &self,
        pos: Position,
        dir: Direction,
        radius: f32,
        move_distance: f32,
        buffer: f32,
    ) -> bool {
        let (dx, dy) = dir.delta();
        let next = Position::new(
            pos.x + dx as f32 * move_distance,
            pos.y + dy as f32 * move_distance,
        );
        let inset = (radius - buffer).max(0.0);
        [
            (next.x - inset, next.y - inset),
            (next.x + inset, next.y - inset),
            (next.x - inset, next.y + inset),
            (next.x + inset, next.y + inset),
        ]
        .into_iter()
        .any(|(x, y)| {
            let tile = self.tile_of(Position::new(x, y));
            self.blocks_player(tile.x, tile.y)
        })
    }

    /// Marks a pellet tile consumed and returns what was there.
    pub fn consume(&mut self, tile: Vec2) -> Option<TileKind> {
        let idx = self.index(tile.x, tile.y)?;
        let kind = self.tiles[idx];
        if !kind.is_pellet() {
            return None;
        }
        self.tiles[idx] = TileKind::Consumed;
        self.pellets_remaining = self.pellets_remaining.saturating_sub(1);
        Some(kind)
    }

    pub fn count_pellet_tiles(&self) -> u32 {
        self.tiles.iter().filter(|kind| kind.is_pellet()).count() as u32
    }

    pub fn rows(&self) -> Vec<Vec<TileKind>> {
        self.tiles
            .chunks(self.width as usize)
            .map(|row| row.to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_LAYOUT, TILE_SIZE};

    fn corridor() -> Maze {
        Maze::parse(&["#####", "#1. #", "#####"], TILE_SIZE).expect("layout parses")
    }

    #[test]
    fn default_layout_parses() {
        let maze = Maze::parse(&DEFAULT_LAYOUT, TILE_SIZE).expect("default layout parses");
        assert_eq!(maze.width(), 20);
        assert_eq!(maze.height(), 20);
        assert_eq!(maze.spawns().len(), 4);
        assert_eq!(maze.house_exit(), Some(Vec2::new(9, 7)));
        assert_eq!(maze.pellets_remaining(), maze.count_pellet_tiles());
        assert!(maze.is_enclosure(9, 8));
        assert!(!maze.is_wall(9, 8));
    }

    #[test]
    fn default_layout_corridors_are_one_tile_wide() {
        let maze = Maze::parse(&DEFAULT_LAYOUT, TILE_SIZE).expect("default layout parses");
        for y in 0..maze.height() - 1 {
            for x in 0..maze.width() - 1 {
                let open_block = [(0, 0), (1, 0), (0, 1), (1, 1)]
                    .iter()
                    .all(|&(dx, dy)| !maze.blocks_player(x + dx, y + dy));
                assert!(!open_block, "open 2x2 block at ({x}, {y})");
            }
        }
    }

    #[test]
    fn rejects_ragged_rows_and_unknown_tiles() {
        assert!(Maze::parse(&["###", "##"], TILE_SIZE).is_err());
        assert!(Maze::parse(&["#?#"], TILE_SIZE).is_err());
    }

    #[test]
    fn vertical_out_of_bounds_is_wall_and_columns_wrap() {
        let maze = Maze::parse(&[" . ", "###"], TILE_SIZE).expect("layout parses");
        assert!(maze.is_wall(1, -1));
        assert!(maze.is_wall(0, 2));
        assert_eq!(maze.tile(4, 0), TileKind::Pellet);
        assert_eq!(maze.tile(-2, 0), TileKind::Pellet);
    }

    #[test]
    fn tile_of_floors_by_tile_size() {
        let maze = corridor();
        assert_eq!(maze.tile_of(Position::new(45.0, 45.0)), Vec2::new(1, 1));
        assert_eq!(maze.tile_of(Position::new(59.9, 30.0)), Vec2::new(1, 1));
        assert_eq!(maze.tile_of(Position::new(60.0, 30.0)), Vec2::new(2, 1));
    }

    #[test]
    fn would_collide_checks_prospective_box() {
        let maze = corridor();
        let center = maze.tile_center(Vec2::new(1, 1));
        assert!(!maze.would_collide(center, Direction::Right, 15.0, 2.0, 1.0));
        assert!(maze.would_collide(center, Direction::Left, 15.0, 2.0, 1.0));
        assert!(maze.would_collide(center, Direction::Up, 15.0, 2.0, 1.0));

        let near_end = maze.tile_center(Vec2::new(3, 1));
        assert!(maze.would_collide(near_end, Direction::Right, 15.0, 2.0, 1.0));
    }

    #[test]
    fn consume_keeps_counter_in_sync() {
        let mut maze = corridor();
        assert_eq!(maze.pellets_remaining(), 1);
        assert_eq!(maze.consume(Vec2::new(2, 1)), Some(TileKind::Pellet));
        assert_eq!(maze.consume(Vec2::new(2, 1)), None);
        assert_eq!(maze.tile(2, 1), TileKind::Consumed);
        assert_eq!(maze.pellets_remaining(), 0);
        assert_eq!(maze.count_pellet_tiles(), 0);
    }

    #[test]
    fn wrap_position_is_horizontal_only() {
        let maze = corridor();
        let wrapped = maze.wrap_position(Position::new(-3.0, -3.0));
        assert_eq!(wrapped, Position::new(maze.pixel_width() - 3.0, -3.0));
    }
}
