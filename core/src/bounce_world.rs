//! Bounce world — a small reference simulation.
//!
//! Players run and jump on a floor, collect falling stars (+10) and get
//! hit by bouncing bombs (-10). When every star is collected the stars
//! drop again and a new bomb spawns with a velocity drawn from the shared
//! sequence. Enough physics to exercise prediction, rollback and bounce
//! interpolation; not a game.
//!
//! Commands: 10 = right, 20 = left, +2 = jump (so 12 / 22 combine).

use serde::{Deserialize, Serialize};

use crate::{
    interpolate::{BodyView, RenderFrame},
    peer::PeerRoster,
    rng::SequenceCursor,
    simulation::Simulation,
    types::{CommandValue, PeerIndex, Vec2},
};

pub const CMD_IDLE: CommandValue = 0;
pub const CMD_JUMP: CommandValue = 2;
pub const CMD_RIGHT: CommandValue = 10;
pub const CMD_LEFT: CommandValue = 20;

pub const WORLD_WIDTH: f64 = 800.0;
pub const FLOOR_Y: f64 = 560.0;
const STAR_COUNT: usize = 12;

const GRAVITY: f64 = 300.0;
const RUN_ACCEL: f64 = 100.0;
const JUMP_SPEED: f64 = 330.0;
const MAX_SPEED: f64 = 200.0;
const GROUND_DRAG: f64 = 0.9;
const PLAYER_BOUNCE: f64 = 0.2;
const TOUCH_RADIUS: f64 = 24.0;
const REST_SPEED: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyKind {
    Player { peer: PeerIndex },
    Star,
    Bomb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub kind:         BodyKind,
    pub position:     Vec2,
    pub velocity:     Vec2,
    pub acceleration: Vec2,
    pub bounce:       Vec2,
    pub gravity:      bool,
    pub enabled:      bool,
    /// Player is overlapping a bomb it was already charged for.
    pub hit_latched:  bool,
}

impl Body {
    fn new(kind: BodyKind, position: Vec2, bounce: Vec2) -> Self {
        Self {
            kind,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            bounce,
            gravity: !matches!(kind, BodyKind::Bomb),
            enabled: true,
            hit_latched: false,
        }
    }

    fn grounded(&self) -> bool {
        self.position.y >= FLOOR_Y
    }

    fn touches(&self, other: &Body) -> bool {
        let dx = self.position.x - other.position.x;
        let dy = self.position.y - other.position.y;
        dx * dx + dy * dy < TOUCH_RADIUS * TOUCH_RADIUS
    }

    fn integrate(&mut self, dt: f64) {
        if self.gravity {
            self.velocity.y += GRAVITY * dt;
        }
        self.velocity.x = (self.velocity.x + self.acceleration.x * dt).clamp(-MAX_SPEED, MAX_SPEED);
        self.velocity.y = (self.velocity.y + self.acceleration.y * dt).clamp(-MAX_SPEED * 2.0, MAX_SPEED * 2.0);
        self.position.x += self.velocity.x * dt;
        self.position.y += self.velocity.y * dt;

        if self.position.x < 0.0 {
            self.position.x = 0.0;
            self.velocity.x = -self.velocity.x * self.bounce.x;
        } else if self.position.x > WORLD_WIDTH {
            self.position.x = WORLD_WIDTH;
            self.velocity.x = -self.velocity.x * self.bounce.x;
        }
        if self.position.y < 0.0 {
            self.position.y = 0.0;
            self.velocity.y = -self.velocity.y * self.bounce.y;
        } else if self.position.y > FLOOR_Y {
            self.position.y = FLOOR_Y;
            self.velocity.y = -self.velocity.y * self.bounce.y;
            if self.velocity.y.abs() < REST_SPEED {
                self.velocity.y = 0.0;
            }
        }

        if matches!(self.kind, BodyKind::Player { .. }) && self.grounded() && self.acceleration.x == 0.0 {
            self.velocity.x *= GROUND_DRAG;
        }
    }
}

/// The payload of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub bodies:     Vec<Body>,
    pub scores:     Vec<i64>,
    pub bomb_count: u32,
}

impl Arena {
    pub fn player(&self, peer: PeerIndex) -> Option<&Body> {
        self.bodies.iter().find(|b| b.kind == BodyKind::Player { peer })
    }

    fn player_mut(&mut self, peer: PeerIndex) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.kind == BodyKind::Player { peer })
    }

    fn collect_and_hit(&mut self, rng: &mut SequenceCursor<'_>) {
        let players: Vec<usize> = (0..self.bodies.len())
            .filter(|&i| matches!(self.bodies[i].kind, BodyKind::Player { .. }))
            .collect();

        for &p in &players {
            let BodyKind::Player { peer } = self.bodies[p].kind else { continue };

            for s in 0..self.bodies.len() {
                let star = &self.bodies[s];
                if star.kind == BodyKind::Star && star.enabled && self.bodies[p].touches(star) {
                    self.bodies[s].enabled = false;
                    self.scores[peer as usize] += 10;
                }
            }

            let hit = self
                .bodies
                .iter()
                .any(|b| b.kind == BodyKind::Bomb && b.enabled && self.bodies[p].touches(b));
            if hit && !self.bodies[p].hit_latched {
                self.scores[peer as usize] -= 10;
            }
            self.bodies[p].hit_latched = hit;
        }

        let stars_left = self.bodies.iter().any(|b| b.kind == BodyKind::Star && b.enabled);
        if !stars_left {
            self.drop_stars_and_spawn_bomb(rng);
        }
    }

    fn drop_stars_and_spawn_bomb(&mut self, rng: &mut SequenceCursor<'_>) {
        for star in self.bodies.iter_mut().filter(|b| b.kind == BodyKind::Star) {
            star.enabled = true;
            star.position.y = 0.0;
            star.velocity = Vec2::ZERO;
        }
        self.bomb_count += 1;
        let mut bomb = Body::new(BodyKind::Bomb, Vec2::new(400.0, 16.0), Vec2::new(1.0, 1.0));
        bomb.velocity = Vec2::new(rng.between(50, 100) as f64, 100.0);
        self.bodies.push(bomb);
        log::debug!("all stars collected; bomb {} spawned", self.bomb_count);
    }
}

/// The simulation driver: holds the local input and what was last drawn.
#[derive(Debug, Default)]
pub struct BounceWorld {
    input:        CommandValue,
    started:      bool,
    frames_drawn: u64,
    scoreboard:   Vec<String>,
}

impl BounceWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the local player is pressing.
    pub fn set_input(&mut self, command: CommandValue) {
        self.input = command;
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// One line per peer from the last rendered frame.
    pub fn scoreboard(&self) -> &[String] {
        &self.scoreboard
    }
}

impl Simulation for BounceWorld {
    type Payload = Arena;

    fn name(&self) -> &'static str { "bounce_world" }

    fn create_initial(&mut self, roster: &PeerRoster, rng: &mut SequenceCursor<'_>) -> Arena {
        let mut bodies = Vec::with_capacity(roster.len() + STAR_COUNT);
        for index in 0..roster.len() {
            let peer = index as PeerIndex;
            bodies.push(Body::new(
                BodyKind::Player { peer },
                Vec2::new(100.0 + index as f64 * 40.0, 450.0),
                Vec2::new(PLAYER_BOUNCE, PLAYER_BOUNCE),
            ));
        }
        for i in 0..STAR_COUNT {
            let bounce_y = rng.between(4, 8) as f64 / 10.0;
            bodies.push(Body::new(
                BodyKind::Star,
                Vec2::new(12.0 + 70.0 * i as f64, 0.0),
                Vec2::new(0.2, bounce_y),
            ));
        }
        Arena { bodies, scores: vec![0; roster.len()], bomb_count: 0 }
    }

    fn apply_command(
        &self,
        world: &mut Arena,
        peer: PeerIndex,
        command: CommandValue,
        _rng: &mut SequenceCursor<'_>,
    ) {
        let Some(body) = world.player_mut(peer) else { return };
        let horizontal = command - command % 10;
        body.acceleration.x = match horizontal {
            CMD_RIGHT => RUN_ACCEL,
            CMD_LEFT => -RUN_ACCEL,
            _ => 0.0,
        };
        if command % 10 == CMD_JUMP && body.grounded() {
            body.velocity.y = -JUMP_SPEED;
        }
    }

    fn step_fixed(&self, world: &mut Arena, dt: f64, rng: &mut SequenceCursor<'_>) {
        for body in world.bodies.iter_mut().filter(|b| b.enabled) {
            body.integrate(dt);
        }
        world.collect_and_hit(rng);
    }

    fn bodies(&self, world: &Arena) -> Vec<BodyView> {
        world
            .bodies
            .iter()
            .map(|b| BodyView {
                position:    b.position,
                velocity:    b.velocity,
                interpolate: true,
                enabled:     b.enabled,
            })
            .collect()
    }

    fn read_command(&mut self) -> CommandValue {
        self.input
    }

    fn ready_to_start(&mut self) {
        self.started = true;
    }

    fn render(&mut self, frame: &RenderFrame<'_, Arena>) {
        self.frames_drawn += 1;
        self.scoreboard = (0..frame.roster.len())
            .map(|i| {
                let peer = i as PeerIndex;
                let score = frame.state.payload.scores.get(i).copied().unwrap_or(0);
                format!("{}: {score}", frame.roster.label(peer))
            })
            .collect();
    }
}
