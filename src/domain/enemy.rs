/// Enemies: a closed set of behaviours sharing one pursuit/collision core.
///
///   grunt : straight pursuit
///   runner: pursuit with a sinusoidal sideways weave
///   brute : pursuit with a timed double-speed charge
///
/// Movement is tentative: the displacement is applied, and if it lands in
/// a wall or obstacle the enemy steps back and tries a fixed list of
/// alternative headings before giving up for the tick.

use super::geom::{Rect, Vec2};
use super::room::RoomGeometry;

pub const ENEMY_SIZE: i32 = 36;
pub const ENEMY_SPEED: f32 = 140.0;

const HURT_FLASH: f32 = 0.12;
const HIT_INVULN: f32 = 0.05;

const RUNNER_WEAVE_RATE: f32 = 6.0;
const RUNNER_WEAVE_AMP: f32 = 0.6;

const BRUTE_TRIGGER_RADIUS: f32 = 180.0;
const BRUTE_CHARGE_TIME: f32 = 0.6;
const BRUTE_CHARGE_COOLDOWN: f32 = 2.0;
const BRUTE_CHARGE_MUL: f32 = 2.0;

/// Detours run slower than straight pursuit.
const DETOUR_SPEED_MUL: f32 = 0.8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EnemyKind {
    Grunt,
    Runner,
    Brute,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Grunt, EnemyKind::Runner, EnemyKind::Brute];

    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Grunt => "grunt",
            EnemyKind::Runner => "runner",
            EnemyKind::Brute => "brute",
        }
    }
}

/// Per-kind behaviour state.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Behavior {
    Grunt,
    Runner { phase: f32 },
    Brute { charge_cooldown: f32, charge_time: f32 },
}

impl Behavior {
    pub fn new(kind: EnemyKind) -> Self {
        match kind {
            EnemyKind::Grunt => Behavior::Grunt,
            EnemyKind::Runner => Behavior::Runner { phase: 0.0 },
            EnemyKind::Brute => Behavior::Brute { charge_cooldown: 0.0, charge_time: 0.0 },
        }
    }

    pub fn kind(&self) -> EnemyKind {
        match self {
            Behavior::Grunt => EnemyKind::Grunt,
            Behavior::Runner { .. } => EnemyKind::Runner,
            Behavior::Brute { .. } => EnemyKind::Brute,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub rect: Rect,
    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,
    pub hurt_timer: f32,
    pub invuln_timer: f32,
    pub speed_scale: f32,
    pub behavior: Behavior,
}

impl Enemy {
    pub fn new(kind: EnemyKind, cx: i32, cy: i32, hp: u32, speed_scale: f32) -> Self {
        Enemy {
            rect: Rect::centered(cx, cy, ENEMY_SIZE, ENEMY_SIZE),
            hp: hp as f32,
            max_hp: hp as f32,
            alive: true,
            hurt_timer: 0.0,
            invuln_timer: 0.0,
            speed_scale: speed_scale.max(0.1),
            behavior: Behavior::new(kind),
        }
    }

    pub fn kind(&self) -> EnemyKind {
        self.behavior.kind()
    }

    pub fn is_charging(&self) -> bool {
        matches!(self.behavior, Behavior::Brute { charge_time, .. } if charge_time > 0.0)
    }

    /// Apply damage. Returns true only on the hit that kills.
    ///
    /// Rejected outright while dead or inside the post-hit window, so one
    /// overlapping attack cannot land twice in the same frame.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.alive || self.invuln_timer > 0.0 {
            return false;
        }
        self.hp -= amount.max(0.0);
        self.hurt_timer = HURT_FLASH;
        self.invuln_timer = HIT_INVULN;
        if self.hp <= 0.0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Advance one tick toward `target`. Returns true on the tick a
    /// brute starts a charge.
    pub fn update(&mut self, target: (i32, i32), dt: f32, geo: &RoomGeometry) -> bool {
        if !self.alive {
            return false;
        }
        self.hurt_timer = (self.hurt_timer - dt).max(0.0);
        self.invuln_timer = (self.invuln_timer - dt).max(0.0);

        let to_target = Vec2::between(self.rect.center(), target);
        let dir = to_target.normalized();
        let base = ENEMY_SPEED * self.speed_scale;
        let mut charge_started = false;

        let velocity = match &mut self.behavior {
            Behavior::Grunt => dir * base,
            Behavior::Runner { phase } => {
                *phase += dt * RUNNER_WEAVE_RATE;
                let weave = dir.perp() * (RUNNER_WEAVE_AMP * phase.sin());
                let heading = dir + weave;
                let heading = if heading.length_squared() > 0.0 { heading.normalized() } else { dir };
                heading * base
            }
            Behavior::Brute { charge_cooldown, charge_time } => {
                *charge_cooldown = (*charge_cooldown - dt).max(0.0);
                *charge_time = (*charge_time - dt).max(0.0);
                if *charge_time == 0.0 && *charge_cooldown == 0.0 && to_target.length() < BRUTE_TRIGGER_RADIUS {
                    *charge_time = BRUTE_CHARGE_TIME;
                    *charge_cooldown = BRUTE_CHARGE_COOLDOWN;
                    charge_started = true;
                }
                let mul = if *charge_time > 0.0 { BRUTE_CHARGE_MUL } else { 1.0 };
                dir * (base * mul)
            }
        };

        let prev = self.rect;
        let moved = prev.translated((velocity.x * dt) as i32, (velocity.y * dt) as i32);
        if geo.blocked(&moved) {
            self.navigate_around(prev, velocity, dt, geo);
        } else {
            self.rect = moved;
        }
        charge_started
    }

    /// Try perpendiculars, diagonals, then a partial retreat, each at
    /// detour speed from the pre-move position. Stays put if all fail.
    fn navigate_around(&mut self, prev: Rect, v: Vec2, dt: f32, geo: &RoomGeometry) {
        self.rect = prev;
        let speed = v.length();
        let alternatives = [
            Vec2::new(v.y, -v.x),
            Vec2::new(-v.y, v.x),
            Vec2::new(v.x * 0.7 + v.y * 0.7, v.y * 0.7 - v.x * 0.7),
            Vec2::new(v.x * 0.7 - v.y * 0.7, v.y * 0.7 + v.x * 0.7),
            Vec2::new(-v.x * 0.5, -v.y * 0.5),
        ];
        for alt in alternatives {
            let alt = if speed > 0.0 && alt.length() > 0.0 {
                alt.normalized() * (speed * DETOUR_SPEED_MUL)
            } else {
                alt
            };
            let candidate = prev.translated((alt.x * dt) as i32, (alt.y * dt) as i32);
            if !geo.blocked(&candidate) {
                self.rect = candidate;
                return;
            }
        }
    }
}
