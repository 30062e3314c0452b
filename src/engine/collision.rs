use super::*;

impl GameEngine {
    /// Pellets first, then agent contacts, then player-vs-player. A death
    /// resets the board and ends contact processing for the tick.
    pub(super) fn resolve_collisions(&mut self) {
        self.collect_pellets();
        if self.resolve_agent_contacts() {
            return;
        }
        self.resolve_player_contacts();
    }

    fn collect_pellets(&mut self) {
        for idx in 0..self.players.len() {
            if !self.players[idx].is_active() {
                continue;
            }
            let tile = self.maze.tile_of(self.players[idx].pos);
            match self.maze.consume(tile) {
                Some(TileKind::Pellet) => {
                    self.players[idx].score += self.config.pellet_points;
                    self.pellets_since_reset += 1;
                }
                Some(TileKind::PowerPellet) => {
                    let player = &mut self.players[idx];
                    player.score += self.config.power_pellet_points;
                    player.power_up.arm(self.config.power_up_secs);
                    self.pellets_since_reset += 1;
                    tracing::debug!(player_id = player.id, "power pellet");
                    self.frighten_agents();
                }
                _ => {}
            }
        }
    }

    fn resolve_agent_contacts(&mut self) -> bool {
        for p in 0..self.players.len() {
            if !self.players[p].is_active() {
                continue;
            }
            for a in 0..self.agents.len() {
                let agent = &self.agents[a];
                if matches!(agent.mode, AgentMode::Eaten | AgentMode::InHouse) {
                    continue;
                }
                let player = &self.players[p];
                if player.pos.distance(agent.pos) > self.config.capture_radius {
                    continue;
                }

                if agent.mode == AgentMode::Frightened || player.power_up.is_running() {
                    let points = self.config.agent_capture_points;
                    self.players[p].score += points;
                    let agent = &mut self.agents[a];
                    agent.mode = AgentMode::Eaten;
                    agent.last_decision = None;
                    agent.target_player = None;
                    tracing::debug!(player_id = self.players[p].id, agent_id = agent.id, "agent captured");
                } else if !player.dashing.is_running() && !player.invulnerable.is_running() {
                    tracing::debug!(player_id = player.id, agent_id = agent.id, "player caught");
                    self.kill_player(p);
                    self.reset_board();
                    return true;
                }
            }
        }
        false
    }

    fn resolve_player_contacts(&mut self) {
        for a in 0..self.players.len() {
            for b in a + 1..self.players.len() {
                let (first, second) = (&self.players[a], &self.players[b]);
                if !first.is_active() || !second.is_active() {
                    continue;
                }
                if first.pos.distance(second.pos) > self.config.pvp_radius {
                    continue;
                }
                let (hunter, victim) = match (
                    first.power_up.is_running(),
                    second.power_up.is_running(),
                ) {
                    (true, false) => (a, b),
                    (false, true) => (b, a),
                    _ => continue,
                };
                let target = &self.players[victim];
                if target.invulnerable.is_running() || target.dashing.is_running() {
                    continue;
                }

                self.players[hunter].score += self.config.pvp_capture_points;
                tracing::debug!(
                    hunter = self.players[hunter].id,
                    victim = self.players[victim].id,
                    "player captured"
                );
                self.kill_player(victim);
                self.reset_board();
                return;
            }
        }
    }

    fn kill_player(&mut self, idx: usize) {
        let spawn = self.maze.tile_center(self.players[idx].spawn);
        let player = &mut self.players[idx];
        player.lives = player.lives.saturating_sub(1);
        player.dir = Direction::None;
        player.queued_dir = None;
        player.dash_requested = false;
        player.power_up.clear();
        if player.lives == 0 {
            player.status = PlayerStatus::Spectating;
            tracing::info!(player_id = player.id, score = player.score, "player eliminated");
        } else {
            player.pos = spawn;
            player.invulnerable.arm(self.config.invulnerable_secs);
            tracing::info!(player_id = player.id, lives = player.lives, "player lost a life");
        }
    }

    pub(super) fn reset_board(&mut self) {
        for player in &mut self.players {
            if !player.is_active() {
                continue;
            }
            player.pos = self.maze.tile_center(player.spawn);
            player.dir = Direction::None;
            player.queued_dir = None;
            player.dash_requested = false;
            player.power_up.clear();
        }
        for agent in &mut self.agents {
            agent.pos = self.maze.tile_center(agent.home);
            agent.dir = Direction::None;
            agent.mode = AgentMode::InHouse;
            agent.release.arm(agent.initial_release_secs);
            agent.release_pellets = Some(agent.initial_release_pellets);
            agent.last_decision = None;
            agent.target_player = None;
        }
        self.frightened.clear();
        self.schedule.restart();
        self.pellets_since_reset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{engine_on, engine_on_owned, open_room, start, tick_secs};
    use super::*;

    fn agent_at(engine: &GameEngine, tile: Vec2, mode: AgentMode) -> Agent {
        Agent {
            id: engine.agents.len() as u32 + 1,
            kind: AgentKind::Chaser,
            home: Vec2::new(10, 5),
            pos: engine.maze.tile_center(tile),
            dir: Direction::None,
            mode,
            release: Countdown::default(),
            release_pellets: None,
            initial_release_secs: 4.0,
            initial_release_pellets: 12,
            last_decision: None,
            target_player: None,
        }
    }

    #[test]
    fn pellets_score_and_never_grow_back() {
        let mut engine = engine_on(&["######", "#1..o#", "######"], 1);
        engine.queue_move(1, Direction::Right);
        let mut last = engine.pellets_remaining();
        let mut last_score = 0;
        for _ in 0..90 {
            engine.step(tick_secs());
            assert!(engine.pellets_remaining() <= last);
            assert!(engine.players[0].score >= last_score);
            last = engine.pellets_remaining();
            last_score = engine.players[0].score;
            assert_eq!(last, engine.maze.count_pellet_tiles());
        }
        assert_eq!(engine.pellets_remaining(), 0);
        let config = &engine.config;
        assert_eq!(
            engine.players[0].score,
            2 * config.pellet_points + config.power_pellet_points
        );
    }

    #[test]
    fn power_pellet_frightens_and_powers_up() {
        let mut engine = engine_on_owned(&open_room(), 1);
        let agent = agent_at(&engine, Vec2::new(15, 15), AgentMode::Chase);
        engine.agents.push(agent);
        engine.agents[0].dir = Direction::Left;
        engine.maze = Maze::parse(
            &open_room()
                .into_iter()
                .enumerate()
                .map(|(y, row)| if y == 1 { row.replacen(' ', "o", 1) } else { row })
                .collect::<Vec<_>>(),
            engine.maze.tile_size(),
        )
        .expect("layout parses");
        engine.players[0].pos = engine.maze.tile_center(Vec2::new(2, 1));
        engine.step(tick_secs());
        assert!(engine.players[0].power_up.is_running());
        assert!(engine.frightened.is_running());
        assert_eq!(engine.agents[0].mode, AgentMode::Frightened);
        assert_eq!(engine.players[0].score, engine.config.power_pellet_points);
        assert_eq!(engine.pellets_since_reset, 1);
    }

    #[test]
    fn frightened_agent_is_captured() {
        let mut engine = engine_on_owned(&open_room(), 1);
        let agent = agent_at(&engine, Vec2::new(1, 1), AgentMode::Frightened);
        engine.agents.push(agent);
        engine.resolve_collisions();
        assert_eq!(engine.agents[0].mode, AgentMode::Eaten);
        assert_eq!(engine.players[0].score, engine.config.agent_capture_points);
        assert_eq!(engine.players[0].lives, engine.config.starting_lives);
    }

    #[test]
    fn contact_costs_a_life_and_resets_the_board() {
        let mut engine = engine_on_owned(&open_room(), 1);
        let agent = agent_at(&engine, Vec2::new(3, 3), AgentMode::Chase);
        engine.agents.push(agent);
        engine.players[0].pos = engine.maze.tile_center(Vec2::new(3, 3));
        engine.pellets_since_reset = 7;
        engine.frightened.arm(2.0);
        engine.schedule.tick(3.0);

        engine.resolve_collisions();

        let player = &engine.players[0];
        assert_eq!(player.lives, engine.config.starting_lives - 1);
        assert_eq!(player.pos, engine.maze.tile_center(player.spawn));
        assert!(player.invulnerable.is_running());
        let agent = &engine.agents[0];
        assert_eq!(agent.mode, AgentMode::InHouse);
        assert_eq!(agent.pos, engine.maze.tile_center(agent.home));
        assert_eq!(agent.release.remaining(), 4.0);
        assert_eq!(agent.release_pellets, Some(12));
        assert!(!engine.frightened.is_running());
        assert_eq!(engine.schedule.index(), 0);
        assert_eq!(engine.schedule.remaining(), engine.config.mode_schedule[0].duration_secs);
        assert_eq!(engine.pellets_since_reset, 0);
    }

    #[test]
    fn invulnerable_and_dashing_players_pass_through() {
        let mut engine = engine_on_owned(&open_room(), 1);
        let agent = agent_at(&engine, Vec2::new(1, 1), AgentMode::Chase);
        engine.agents.push(agent);
        engine.players[0].invulnerable.arm(1.0);
        engine.resolve_collisions();
        assert_eq!(engine.players[0].lives, engine.config.starting_lives);

        engine.players[0].invulnerable.clear();
        engine.players[0].dashing.arm(0.1);
        engine.resolve_collisions();
        assert_eq!(engine.players[0].lives, engine.config.starting_lives);
        assert_eq!(engine.agents[0].mode, AgentMode::Chase);
    }

    #[test]
    fn last_life_makes_a_spectator_who_stays_out() {
        let mut engine = engine_on_owned(&open_room(), 2);
        engine.players[0].lives = 1;
        let agent = agent_at(&engine, Vec2::new(1, 1), AgentMode::Chase);
        engine.agents.push(agent);
        engine.resolve_collisions();
        assert_eq!(engine.players[0].lives, 0);
        assert_eq!(engine.players[0].status, PlayerStatus::Spectating);

        // Spectators are skipped by every contact check.
        let agent = agent_at(&engine, Vec2::new(1, 1), AgentMode::Chase);
        engine.agents[0] = agent;
        engine.resolve_collisions();
        assert_eq!(engine.players[0].lives, 0);
        assert_eq!(engine.agents[0].mode, AgentMode::Chase);
        assert!(!engine.queue_move(1, Direction::Right));

        engine.check_end_conditions();
        assert!(engine.is_game_over());
        assert_eq!(engine.winners(), vec![2]);
    }

    #[test]
    fn powered_player_captures_unpowered_player() {
        let mut engine = engine_on_owned(&open_room(), 2);
        let meeting = engine.maze.tile_center(Vec2::new(5, 5));
        engine.players[0].pos = meeting;
        engine.players[1].pos = Position::new(meeting.x + 10.0, meeting.y);
        engine.players[1].power_up.arm(3.0);
        engine.resolve_collisions();
        assert_eq!(engine.players[1].score, engine.config.pvp_capture_points);
        assert_eq!(engine.players[0].lives, engine.config.starting_lives - 1);
        assert!(!engine.players[1].power_up.is_running());
    }

    #[test]
    fn equal_power_players_ignore_each_other() {
        let mut engine = engine_on_owned(&open_room(), 2);
        let meeting = engine.maze.tile_center(Vec2::new(5, 5));
        engine.players[0].pos = meeting;
        engine.players[1].pos = meeting;
        engine.resolve_collisions();
        engine.players[0].power_up.arm(3.0);
        engine.players[1].power_up.arm(3.0);
        engine.resolve_collisions();
        assert_eq!(engine.players[0].lives, engine.config.starting_lives);
        assert_eq!(engine.players[1].lives, engine.config.starting_lives);
    }

    #[test]
    fn invulnerable_victim_is_skipped() {
        let mut engine = engine_on_owned(&open_room(), 2);
        let meeting = engine.maze.tile_center(Vec2::new(5, 5));
        engine.players[0].pos = meeting;
        engine.players[1].pos = meeting;
        engine.players[0].power_up.arm(3.0);
        engine.players[1].invulnerable.arm(3.0);
        engine.resolve_collisions();
        assert_eq!(engine.players[1].lives, engine.config.starting_lives);
        assert_eq!(engine.players[0].score, 0);
    }

    #[test]
    fn lives_never_drop_below_zero_over_a_full_match() {
        let config = GameConfig::default();
        let mut engine =
            GameEngine::new(&config, vec![start(0), start(1), start(2)], 3).expect("engine builds");
        for tick in 0..20_000 {
            if tick % 45 == 0 {
                let dir = Direction::PRIORITY[(tick / 45) % 4];
                for id in 1..=3 {
                    engine.queue_move(id, dir);
                }
            }
            engine.step(tick_secs());
            for player in &engine.players {
                assert!(player.lives <= config.starting_lives);
                if player.lives == 0 {
                    assert_eq!(player.status, PlayerStatus::Spectating);
                }
            }
            if engine.is_finished() {
                break;
            }
        }
    }
}
