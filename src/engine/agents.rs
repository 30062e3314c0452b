use super::*;

impl GameEngine {
    pub(super) fn update_agents(&mut self, dt: f32) {
        for idx in 0..self.agents.len() {
            self.update_agent_mode(idx);
            self.move_agent(idx, dt);
        }
    }

    fn update_agent_mode(&mut self, idx: usize) {
        let global = self.schedule.current_mode();
        let house_exit = self.maze.house_exit();
        let home_center = self.maze.tile_center(self.agents[idx].home);
        let pellets = self.pellets_since_reset;
        let agent = &mut self.agents[idx];
        match agent.mode {
            AgentMode::InHouse => {
                let by_timer = !agent.release.is_running();
                let by_pellets = agent.release_pellets.is_some_and(|needed| pellets >= needed);
                if by_timer || by_pellets {
                    agent.release.clear();
                    agent.release_pellets = None;
                    agent.last_decision = None;
                    agent.mode = if house_exit.is_some() {
                        AgentMode::ExitingHouse
                    } else {
                        global
                    };
                    tracing::debug!(agent_id = agent.id, kind = ?agent.kind, "agent released");
                }
            }
            AgentMode::Eaten => {
                if agent.pos.distance(home_center) <= self.config.home_tolerance {
                    self.return_home(idx);
                }
            }
            _ => {}
        }
    }

    fn return_home(&mut self, idx: usize) {
        let home_center = self.maze.tile_center(self.agents[idx].home);
        let agent = &mut self.agents[idx];
        agent.pos = home_center;
        agent.dir = Direction::None;
        agent.mode = AgentMode::InHouse;
        agent.release.arm(self.config.re_release_secs);
        agent.release_pellets = None;
        agent.last_decision = None;
        agent.target_player = None;
    }

    fn agent_speed(&self, mode: AgentMode) -> f32 {
        let multiplier = match mode {
            AgentMode::Frightened => self.config.frightened_speed_multiplier,
            AgentMode::Eaten => self.config.eaten_speed_multiplier,
            AgentMode::InHouse | AgentMode::ExitingHouse => self.config.house_speed_multiplier,
            AgentMode::Scatter | AgentMode::Chase => 1.0,
        };
        self.config.agent_speed * multiplier
    }

    fn move_agent(&mut self, idx: usize, dt: f32) {
        if self.agents[idx].mode == AgentMode::InHouse {
            return;
        }
        let step = self.agent_speed(self.agents[idx].mode) * dt;
        if step <= 0.0 {
            return;
        }

        let pos = self.agents[idx].pos;
        let tile = self.maze.tile_of(pos);
        let center = self.maze.tile_center(tile);
        let at_center = (pos.x - center.x).abs() <= step && (pos.y - center.y).abs() <= step;
        let agent = &self.agents[idx];
        if at_center && (agent.last_decision != Some(tile) || agent.dir.is_none()) {
            let agent = &mut self.agents[idx];
            agent.pos = center;
            agent.last_decision = Some(tile);

            match agent.mode {
                AgentMode::Eaten if tile == agent.home => {
                    self.return_home(idx);
                    return;
                }
                AgentMode::ExitingHouse if Some(tile) == self.maze.house_exit() => {
                    agent.mode = if self.frightened.is_running() {
                        AgentMode::Frightened
                    } else {
                        self.schedule.current_mode()
                    };
                }
                _ => {}
            }

            let dir = self.choose_direction(idx);
            self.agents[idx].dir = dir;
        }

        let agent = &mut self.agents[idx];
        let (dx, dy) = agent.dir.delta();
        let next = Position::new(agent.pos.x + dx as f32 * step, agent.pos.y + dy as f32 * step);
        agent.pos = self.maze.wrap_position(next);
    }

    fn choose_direction(&mut self, idx: usize) -> Direction {
        let target = self.agent_target(idx);
        let agent = &self.agents[idx];
        let tile = self.maze.tile_of(agent.pos);
        let frightened = agent.mode == AgentMode::Frightened;
        let may_enter_house = matches!(agent.mode, AgentMode::Eaten | AgentMode::ExitingHouse);
        let reverse = agent.dir.opposite();

        let open = |dir: Direction| {
            let next = tile.step(dir, 1);
            !self.maze.is_wall(next.x, next.y)
                && (may_enter_house || !self.maze.is_enclosure(next.x, next.y))
        };

        let mut best: Option<(Direction, i64)> = None;
        for dir in Direction::PRIORITY {
            if !open(dir) || (!frightened && !reverse.is_none() && dir == reverse) {
                continue;
            }
            let next = tile.step(dir, 1);
            let distance = Vec2::new(self.maze.wrap_x(next.x), next.y).distance_sq(target);
            let better = match best {
                None => true,
                Some((_, best_distance)) if frightened => distance > best_distance,
                Some((_, best_distance)) => distance < best_distance,
            };
            if better {
                best = Some((dir, distance));
            }
        }

        match best {
            Some((dir, _)) => dir,
            None if !reverse.is_none() && open(reverse) => reverse,
            None => Direction::None,
        }
    }

    fn agent_target(&mut self, idx: usize) -> Vec2 {
        let agent = &self.agents[idx];
        match agent.mode {
            AgentMode::InHouse => agent.home,
            AgentMode::Eaten => {
                // Outside the house, head for the door first; only then home.
                let tile = self.maze.tile_of(agent.pos);
                match self.maze.house_exit() {
                    Some(exit) if tile != exit && !self.maze.is_enclosure(tile.x, tile.y) => exit,
                    _ => agent.home,
                }
            }
            AgentMode::ExitingHouse => self.maze.house_exit().unwrap_or(agent.home),
            AgentMode::Frightened => {
                let x = self.rng.below(self.maze.width() as u32) as i32;
                let y = self.rng.below(self.maze.height() as u32) as i32;
                Vec2::new(x, y)
            }
            AgentMode::Scatter => self.scatter_corner(agent.kind),
            AgentMode::Chase => self.chase_target(idx),
        }
    }

    fn scatter_corner(&self, kind: AgentKind) -> Vec2 {
        let (right, bottom) = (self.maze.width() - 1, self.maze.height() - 1);
        match kind {
            AgentKind::Chaser => Vec2::new(right, 0),
            AgentKind::Ambusher => Vec2::new(0, 0),
            AgentKind::Pincer => Vec2::new(right, bottom),
            AgentKind::Shy => Vec2::new(0, bottom),
        }
    }

    fn nearest_active_player(&self, pos: Position) -> Option<usize> {
        let mut nearest: Option<(usize, f32)> = None;
        for (idx, player) in self.players.iter().enumerate() {
            if !player.is_active() {
                continue;
            }
            let distance = player.pos.distance(pos);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((idx, distance));
            }
        }
        nearest.map(|(idx, _)| idx)
    }

    fn chase_target(&mut self, idx: usize) -> Vec2 {
        let agent = &self.agents[idx];
        let kind = agent.kind;
        let agent_tile = self.maze.tile_of(agent.pos);
        let Some(player_idx) = self.nearest_active_player(agent.pos) else {
            self.agents[idx].target_player = None;
            return self.scatter_corner(kind);
        };
        let player = &self.players[player_idx];
        let player_tile = self.maze.tile_of(player.pos);
        let heading = player.heading();
        self.agents[idx].target_player = Some(player.id);

        match kind {
            AgentKind::Chaser => player_tile,
            AgentKind::Ambusher => player_tile.step(heading, self.config.ambush_tiles_ahead),
            AgentKind::Pincer => {
                let pivot = player_tile.step(heading, self.config.pincer_tiles_ahead);
                let anchor = self
                    .agents
                    .iter()
                    .find(|other| other.kind == AgentKind::Chaser)
                    .map(|other| self.maze.tile_of(other.pos))
                    .unwrap_or(agent_tile);
                Vec2::new(2 * pivot.x - anchor.x, 2 * pivot.y - anchor.y)
            }
            AgentKind::Shy => {
                let distance = (agent_tile.distance_sq(player_tile) as f32).sqrt();
                if distance > self.config.shy_distance_tiles {
                    player_tile
                } else {
                    self.scatter_corner(kind)
                }
            }
        }
    }

    pub(super) fn frighten_agents(&mut self) {
        self.frightened.extend_to(self.config.power_up_secs);
        for agent in &mut self.agents {
            if matches!(agent.mode, AgentMode::Scatter | AgentMode::Chase) {
                agent.reverse();
                agent.mode = AgentMode::Frightened;
            }
        }
    }
}
