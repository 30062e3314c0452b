use super::*;

impl GameEngine {
    pub(super) fn move_players(&mut self, dt: f32) {
        for idx in 0..self.players.len() {
            if !self.players[idx].is_active() {
                self.players[idx].dash_requested = false;
                continue;
            }
            if std::mem::take(&mut self.players[idx].dash_requested) && self.try_dash(idx) {
                continue;
            }
            self.apply_queued_turn(idx, dt);
            self.advance_player(idx, dt);
        }
    }

    fn apply_queued_turn(&mut self, idx: usize, dt: f32) {
        let Some(next) = self.players[idx].queued_dir else {
            return;
        };
        let pos = self.players[idx].pos;
        let center = self.maze.tile_center(self.maze.tile_of(pos));
        let tolerance = self.config.alignment_tolerance;
        let (aligned, snapped) = if next.is_horizontal() {
            ((pos.y - center.y).abs() <= tolerance, Position::new(pos.x, center.y))
        } else {
            ((pos.x - center.x).abs() <= tolerance, Position::new(center.x, pos.y))
        };
        if !aligned {
            return;
        }
        let probe = (self.config.player_speed * dt).max(self.config.collision_buffer);
        if self.maze.would_collide(
            snapped,
            next,
            self.config.entity_radius,
            probe,
            self.config.collision_buffer,
        ) {
            return;
        }
        let player = &mut self.players[idx];
        player.pos = snapped;
        player.dir = next;
        player.last_dir = next;
        player.queued_dir = None;
    }

    fn advance_player(&mut self, idx: usize, dt: f32) {
        let dir = self.players[idx].dir;
        if dir.is_none() {
            return;
        }
        let distance = self.config.player_speed * dt;
        let pos = self.players[idx].pos;
        if self.maze.would_collide(
            pos,
            dir,
            self.config.entity_radius,
            distance,
            self.config.collision_buffer,
        ) {
            self.players[idx].dir = Direction::None;
            return;
        }
        let (dx, dy) = dir.delta();
        let next = Position::new(pos.x + dx as f32 * distance, pos.y + dy as f32 * distance);
        self.players[idx].pos = self.maze.wrap_position(next);
    }

    pub(super) fn try_dash(&mut self, idx: usize) -> bool {
        let player = &self.players[idx];
        if !player.is_active() || player.dash_cooldown.is_running() {
            return false;
        }
        let heading = player.heading();
        if heading.is_none() {
            return false;
        }
        let landing = self
            .maze
            .tile_of(player.pos)
            .step(heading, self.config.dash_tiles);
        let landing = Vec2::new(self.maze.wrap_x(landing.x), landing.y);
        if self.maze.blocks_player(landing.x, landing.y) {
            tracing::debug!(player_id = player.id, ?landing, "dash blocked");
            return false;
        }

        let center = self.maze.tile_center(landing);
        let player = &mut self.players[idx];
        player.pos = center;
        player.dashing.arm(self.config.dash_active_secs);
        player.dash_cooldown.arm(self.config.dash_cooldown_secs);
        player.queued_dir = None;
        tracing::debug!(player_id = player.id, ?landing, "dash");
        true
    }
}
