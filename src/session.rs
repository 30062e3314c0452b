use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::GameConfig;
use crate::engine::GameEngine;
use crate::lobby::Lobby;
use crate::server_protocol::{parse_client_message, ParsedClientMessage, ServerEvent};
use crate::server_utils::{client_order_key, normalize_game_speed, tick_period};

struct ClientContext {
    tx: mpsc::Sender<String>,
    player_id: Option<u32>,
}

enum Phase {
    Lobby(Lobby),
    Match(Box<GameEngine>),
}

pub struct ServerContext {
    config: GameConfig,
    clients: HashMap<String, ClientContext>,
    phase: Phase,
    next_client_seq: u64,
    game_speed: f32,
    next_seed: u32,
}

impl ServerContext {
    pub fn new(config: GameConfig, seed: u32) -> Self {
        Self {
            phase: Phase::Lobby(Lobby::new(&config.slot_colors)),
            config,
            clients: HashMap::new(),
            next_client_seq: 1,
            game_speed: 1.0,
            next_seed: seed,
        }
    }

    pub fn game_speed(&self) -> f32 {
        self.game_speed
    }

    pub fn tick_period(&self) -> Duration {
        tick_period(self.config.tick_rate, self.game_speed)
    }

    pub fn is_match_running(&self) -> bool {
        matches!(self.phase, Phase::Match(_))
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn connect(&mut self, tx: mpsc::Sender<String>) -> String {
        let client_id = format!("client_{}", self.next_client_seq);
        self.next_client_seq += 1;
        self.clients.insert(
            client_id.clone(),
            ClientContext {
                tx,
                player_id: None,
            },
        );

        let greeting = match &self.phase {
            Phase::Lobby(lobby) => ServerEvent::Connected {
                client_id: client_id.clone(),
                lobby_state: lobby.state(None),
            },
            Phase::Match(_) => ServerEvent::GameInProgress {},
        };
        self.send_to(&client_id, &greeting);
        tracing::info!(client_id, clients = self.clients.len(), "client connected");
        client_id
    }

    pub fn handle_message(&mut self, client_id: &str, raw: &str) {
        if !self.clients.contains_key(client_id) {
            return;
        }
        let message = match parse_client_message(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(client_id, error = %err, "dropping malformed message");
                return;
            }
        };

        match message {
            ParsedClientMessage::JoinLobby { slot_id } => self.join_lobby(client_id, slot_id),
            ParsedClientMessage::StartGame => self.start_match(client_id),
            ParsedClientMessage::Move { direction } => {
                if let Some((engine, player_id)) = self.match_player(client_id) {
                    engine.queue_move(player_id, direction);
                }
            }
            ParsedClientMessage::Dash => {
                if let Some((engine, player_id)) = self.match_player(client_id) {
                    engine.queue_dash(player_id);
                }
            }
            ParsedClientMessage::RequestSpectate => self.attach_observer(client_id),
            ParsedClientMessage::SetGameSpeed { speed } => {
                self.game_speed = normalize_game_speed(speed);
                tracing::info!(client_id, speed = self.game_speed, "game speed changed");
            }
        }
    }

    fn match_player(&mut self, client_id: &str) -> Option<(&mut GameEngine, u32)> {
        let player_id = self.clients.get(client_id)?.player_id?;
        match &mut self.phase {
            Phase::Match(engine) => Some((engine.as_mut(), player_id)),
            Phase::Lobby(_) => None,
        }
    }

    fn join_lobby(&mut self, client_id: &str, slot_id: usize) {
        let Phase::Lobby(lobby) = &mut self.phase else {
            return;
        };
        if !lobby.join(slot_id, client_id) {
            tracing::debug!(client_id, slot_id, "lobby join refused");
            return;
        }
        tracing::info!(client_id, slot_id, seated = lobby.occupied_count(), "joined lobby");
        self.broadcast_lobby(None);
    }

    fn start_match(&mut self, client_id: &str) {
        let Phase::Lobby(lobby) = &self.phase else {
            return;
        };
        let start_players = lobby.start_players();
        if start_players.is_empty() {
            tracing::debug!(client_id, "start ignored, lobby is empty");
            return;
        }

        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(0x9e37_79b9);
        let engine = match GameEngine::new(&self.config, start_players, seed) {
            Ok(engine) => engine,
            Err(err) => {
                tracing::error!(error = %err, "failed to start match");
                return;
            }
        };

        for (id, client) in self.clients.iter_mut() {
            client.player_id = engine.player_id_for_client(id);
        }
        let started = ServerEvent::GameStarted(engine.snapshot());
        let players = engine.active_player_count();
        self.phase = Phase::Match(Box::new(engine));

        for client_id in self.client_ids() {
            let seated = self
                .clients
                .get(&client_id)
                .is_some_and(|client| client.player_id.is_some());
            if seated {
                self.send_to(&client_id, &started);
            } else {
                self.send_to(&client_id, &ServerEvent::GameInProgress {});
            }
        }
        tracing::info!(started_by = client_id, players, seed, "match started");
    }

    fn attach_observer(&mut self, client_id: &str) {
        let Phase::Match(engine) = &mut self.phase else {
            return;
        };
        let Some(client) = self.clients.get_mut(client_id) else {
            return;
        };
        if client.player_id.is_some() {
            return;
        }
        let player_id = engine.add_observer(client_id);
        client.player_id = Some(player_id);
        let snapshot = engine.snapshot();
        tracing::info!(client_id, player_id, "observer attached");
        self.send_to(client_id, &ServerEvent::GameStarted(snapshot));
    }

    pub fn disconnect(&mut self, client_id: &str) {
        let Some(client) = self.clients.remove(client_id) else {
            return;
        };
        tracing::info!(client_id, clients = self.clients.len(), "client disconnected");
        match &mut self.phase {
            Phase::Lobby(lobby) => {
                if lobby.leave(client_id).is_some() {
                    self.broadcast_lobby(None);
                }
            }
            Phase::Match(engine) => {
                if let Some(player_id) = client.player_id {
                    engine.detach_player(player_id);
                }
            }
        }
    }

    pub fn tick(&mut self) {
        let dt = self.config.tick_secs();
        let Phase::Match(engine) = &mut self.phase else {
            return;
        };
        engine.step(dt);
        if engine.is_finished() {
            let message = match engine.winners().as_slice() {
                [] => "Game over. No winners.".to_string(),
                winners => format!(
                    "Game over. Winner: {}",
                    winners
                        .iter()
                        .map(|id| format!("Player {id}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            };
            self.return_to_lobby(message);
            return;
        }

        let update = ServerEvent::GameStateUpdate(engine.snapshot());
        let Some(payload) = encode(&update) else {
            return;
        };
        for client_id in self.client_ids() {
            let seated = self
                .clients
                .get(&client_id)
                .is_some_and(|client| client.player_id.is_some());
            if seated {
                self.deliver(&client_id, payload.clone());
            }
        }
    }

    fn return_to_lobby(&mut self, message: String) {
        let lobby = Lobby::new(&self.config.slot_colors);
        let event = ServerEvent::ReturnToLobby(lobby.state(Some(message)));
        self.phase = Phase::Lobby(lobby);
        for client in self.clients.values_mut() {
            client.player_id = None;
        }
        tracing::info!("match finished, back to lobby");
        self.broadcast(&event);
    }

    fn broadcast_lobby(&self, message: Option<String>) {
        if let Phase::Lobby(lobby) = &self.phase {
            self.broadcast(&ServerEvent::LobbyStateUpdate(lobby.state(message)));
        }
    }

    fn client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.keys().cloned().collect();
        ids.sort_by_key(|id| client_order_key(id));
        ids
    }

    fn broadcast(&self, event: &ServerEvent) {
        let Some(payload) = encode(event) else {
            return;
        };
        for client_id in self.client_ids() {
            self.deliver(&client_id, payload.clone());
        }
    }

    fn send_to(&self, client_id: &str, event: &ServerEvent) {
        if let Some(payload) = encode(event) {
            self.deliver(client_id, payload);
        }
    }

    /// Fire-and-forget. A full or closed queue is logged; the read loop
    /// notices dead sockets on its own.
    fn deliver(&self, client_id: &str, payload: String) {
        let Some(client) = self.clients.get(client_id) else {
            return;
        };
        if let Err(err) = client.tx.try_send(payload) {
            tracing::warn!(client_id, error = %err, "outbound message dropped");
        }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(payload),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode server event");
            None
        }
    }
}
