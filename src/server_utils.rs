use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{MAX_GAME_SPEED, MIN_GAME_SPEED};

/// Clamps a requested speed multiplier; non-finite requests fall back to 1.0.
pub fn normalize_game_speed(value: f32) -> f32 {
    if !value.is_finite() {
        return 1.0;
    }
    value.clamp(MIN_GAME_SPEED, MAX_GAME_SPEED)
}

/// Wall-clock wait between ticks. Simulated tick time is unaffected by speed.
pub fn tick_period(tick_rate: u32, game_speed: f32) -> Duration {
    let base = 1.0 / tick_rate.max(1) as f64;
    Duration::from_secs_f64(base / normalize_game_speed(game_speed) as f64)
}

/// Explicit directory first, then the usual build output locations. A
/// directory only counts if it holds an `index.html`.
pub fn resolve_static_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.join("index.html").is_file() {
            return Some(path.to_path_buf());
        }
    }

    let candidates = [
        PathBuf::from("public"),
        PathBuf::from("dist/client"),
        PathBuf::from("../public"),
    ];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

/// Stable ordering key for `client_N` style identifiers.
pub fn client_order_key(client_id: &str) -> u64 {
    client_id
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}
