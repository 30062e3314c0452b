use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use maze_chase_server::config::GameConfig;
use maze_chase_server::engine::GameEngine;
use maze_chase_server::error::ConfigError;
use maze_chase_server::maze::Maze;
use maze_chase_server::rng::Rng;
use maze_chase_server::types::{
    Direction, PlayerStatus, Position, Snapshot, StartPlayer, TileKind,
};
use serde::Serialize;

/// Headless matches driven by random bots, checked tick by tick for broken
/// game invariants.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Bots per match, capped at the lobby size.
    #[arg(long, default_value_t = 2)]
    players: usize,
    /// Upper bound on ticks per match.
    #[arg(long, default_value_t = 60 * 60 * 5)]
    ticks: u64,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1)]
    runs: usize,
    #[arg(long, env = "GAME_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResultLine {
    run: usize,
    seed: u32,
    players: usize,
    finished_tick: u64,
    game_over: bool,
    winners: Vec<u32>,
    pellets_remaining: u32,
    scores: Vec<u32>,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    run_count: usize,
    anomaly_count: usize,
    average_ticks: u64,
    outcome_counts: BTreeMap<String, usize>,
    runs: Vec<RunResultLine>,
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();

    let config = match GameConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load config");
            std::process::exit(2);
        }
    };
    let players = cli.players.clamp(1, config.lobby_size());
    let base_seed = cli.seed.unwrap_or_else(|| rand::random::<u64>()) as u32;

    let mut results = Vec::new();
    let mut total_anomalies = 0usize;
    for run in 0..cli.runs {
        let seed = base_seed.wrapping_add(run as u32);
        tracing::info!(run, seed, players, "run started");
        let (result, records) = match run_match(&config, run, seed, players, cli.ticks) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(run, error = %err, "failed to build match");
                std::process::exit(2);
            }
        };
        for record in &records {
            tracing::warn!(run, seed, tick = record.tick, "{}", record.message);
        }
        total_anomalies += records.len();
        tracing::info!(
            run,
            finished_tick = result.finished_tick,
            winners = ?result.winners,
            anomalies = records.len(),
            "run finished"
        );
        match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(error = %err, "failed to encode run result"),
        }
        results.push(result);
    }

    let has_anomaly = results.iter().any(|result| !result.anomalies.is_empty());
    let summary = build_run_summary(results, total_anomalies);
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            tracing::error!(path = %path.display(), error = %err, "failed to write summary");
            std::process::exit(2);
        }
    }
    tracing::info!(
        runs = summary.run_count,
        anomalies = summary.anomaly_count,
        average_ticks = summary.average_ticks,
        "simulation finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_match(
    config: &GameConfig,
    run: usize,
    seed: u32,
    players: usize,
    max_ticks: u64,
) -> Result<(RunResultLine, Vec<AnomalyRecord>), ConfigError> {
    let start_players = (0..players)
        .map(|slot| StartPlayer {
            slot,
            client_id: format!("bot_{}", slot + 1),
            color: config.slot_colors[slot].clone(),
        })
        .collect();
    let mut engine = GameEngine::new(config, start_players, seed)?;
    let mut bot_rng = Rng::new(seed ^ 0x5bd1_e995);
    let dt = config.tick_secs();

    let mut anomalies = Vec::new();
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut previous = engine.snapshot();

    while engine.tick_count() < max_ticks && !engine.is_finished() {
        for id in 1..=players as u32 {
            drive_bot(&mut engine, &mut bot_rng, id);
        }
        engine.step(dt);
        let snapshot = engine.snapshot();
        for message in
            collect_snapshot_anomalies(&snapshot, &previous, engine.maze(), config.starting_lives)
        {
            push_anomaly(&mut anomalies, &mut records, &mut seen, snapshot.tick, message);
        }
        previous = snapshot;
    }

    let result = RunResultLine {
        run,
        seed,
        players,
        finished_tick: engine.tick_count(),
        game_over: engine.is_game_over(),
        winners: engine.winners(),
        pellets_remaining: engine.pellets_remaining(),
        scores: previous.players.iter().map(|player| player.score).collect(),
        anomalies,
    };
    Ok((result, records))
}

/// Wanders: a new random heading now and then, an occasional dash.
fn drive_bot(engine: &mut GameEngine, rng: &mut Rng, player_id: u32) {
    if rng.below(20) == 0 {
        let dir = Direction::PRIORITY[rng.below(4) as usize];
        engine.queue_move(player_id, dir);
    }
    if rng.below(240) == 0 {
        engine.queue_dash(player_id);
    }
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    previous: &Snapshot,
    maze: &Maze,
    starting_lives: u32,
) -> Vec<String> {
    let mut anomalies = Vec::new();

    if snapshot.pellets_remaining > previous.pellets_remaining {
        anomalies.push(format!(
            "pellets grew: {} -> {}",
            previous.pellets_remaining, snapshot.pellets_remaining
        ));
    }
    let counted = snapshot
        .map
        .iter()
        .flatten()
        .filter(|tile| tile.is_pellet())
        .count() as u32;
    if counted != snapshot.pellets_remaining {
        anomalies.push(format!(
            "pellet counter {} disagrees with map {counted}",
            snapshot.pellets_remaining
        ));
    }

    for player in &snapshot.players {
        if let Some(before) = previous.players.iter().find(|p| p.id == player.id) {
            if player.score < before.score {
                anomalies.push(format!("player {} score decreased", player.id));
            }
        }
        if player.lives > starting_lives {
            anomalies.push(format!("player {} has {} lives", player.id, player.lives));
        }
        if player.lives == 0 && player.status == PlayerStatus::Active {
            anomalies.push(format!("player {} active with no lives", player.id));
        }
        if player.status == PlayerStatus::Active {
            let tile = maze.tile_of(Position::new(player.x, player.y));
            if maze.blocks_player(tile.x, tile.y) {
                anomalies.push(format!(
                    "player {} inside blocked tile ({}, {})",
                    player.id, tile.x, tile.y
                ));
            }
        }
    }

    for agent in &snapshot.agents {
        let tile = maze.tile_of(Position::new(agent.x, agent.y));
        if maze.tile(tile.x, tile.y) == TileKind::Wall {
            anomalies.push(format!(
                "agent {} inside wall ({}, {})",
                agent.id, tile.x, tile.y
            ));
        }
    }

    for winner in &snapshot.winners {
        let active = snapshot
            .players
            .iter()
            .any(|player| player.id == *winner && player.is_active);
        if !active {
            anomalies.push(format!("winner {winner} is not active"));
        }
    }
    anomalies
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn outcome_key(result: &RunResultLine) -> String {
    match (result.game_over, result.winners.len()) {
        (false, _) => "tick_limit",
        (true, 0) => "no_winner",
        (true, _) if result.pellets_remaining == 0 => "maze_cleared",
        (true, _) => "last_standing",
    }
    .to_string()
}

fn build_run_summary(runs: Vec<RunResultLine>, anomaly_count: usize) -> RunSummary {
    let run_count = runs.len();
    let total_ticks: u64 = runs.iter().map(|run| run.finished_tick).sum();
    let average_ticks = if run_count == 0 {
        0
    } else {
        total_ticks / run_count as u64
    };
    let mut outcome_counts = BTreeMap::new();
    for run in &runs {
        *outcome_counts.entry(outcome_key(run)).or_insert(0) += 1;
    }
    RunSummary {
        run_count,
        anomaly_count,
        average_ticks,
        outcome_counts,
        runs,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
