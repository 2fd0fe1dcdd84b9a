/// Entities: Player, Inventory, Pickup, Chest, Arrow, Spike, Companion.
///
/// Each entity owns its own position and timers and exposes a per-tick
/// `update` plus a collision rect. Cross-entity rules (who hits whom,
/// what a pickup does to the inventory) live in `sim::step`.

use rand::Rng;

use super::enemy::Enemy;
use super::geom::{Rect, Vec2, SCREEN_H, SCREEN_W};
use super::room::{Direction, TILE};

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

pub const PLAYER_SIZE: i32 = 40;
pub const PLAYER_SPEED: f32 = 250.0;
pub const PLAYER_MAX_HP: i32 = 3;
pub const PLAYER_INVULN: f32 = 1.0;
pub const MAGIC_MAX: f32 = 100.0;
pub const MAGIC_REGEN: f32 = 10.0;
pub const SHIELD_COST: f32 = 25.0;

pub const MELEE_COOLDOWN: f32 = 0.35;
pub const MELEE_ACTIVE: f32 = 0.12;
pub const MELEE_RANGE: i32 = 22;
const MELEE_WIDTH: i32 = 12;

pub const SPEED_BOOTS_TIME: f32 = 10.0;

const DIAGONAL_SCALE: f32 = 0.707;

/// Held movement keys for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub rect: Rect,
    prev_center: (i32, i32),
    pub speed: f32,
    pub speed_multiplier: f32,
    pub speed_boots_timer: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub invuln: f32,
    pub facing: Direction,
    pub magic: f32,
    pub melee_cooldown: f32,
    pub melee_active: f32,
    pub shield: bool,
}

impl Player {
    pub fn new(cx: i32, cy: i32) -> Self {
        Player {
            rect: Rect::centered(cx, cy, PLAYER_SIZE, PLAYER_SIZE),
            prev_center: (cx, cy),
            speed: PLAYER_SPEED,
            speed_multiplier: 1.0,
            speed_boots_timer: 0.0,
            hp: PLAYER_MAX_HP,
            max_hp: PLAYER_MAX_HP,
            invuln: 0.0,
            facing: Direction::Down,
            magic: MAGIC_MAX,
            melee_cooldown: 0.0,
            melee_active: 0.0,
            shield: false,
        }
    }

    /// Decay timers, apply held movement, regenerate magic.
    pub fn update(&mut self, dt: f32, intent: MoveIntent) {
        self.melee_cooldown = (self.melee_cooldown - dt).max(0.0);
        self.melee_active = (self.melee_active - dt).max(0.0);
        self.invuln = (self.invuln - dt).max(0.0);
        if self.speed_boots_timer > 0.0 {
            self.speed_boots_timer -= dt;
            if self.speed_boots_timer <= 0.0 {
                self.speed_boots_timer = 0.0;
                self.speed_multiplier = 1.0;
            }
        }

        // Later keys win the facing: left, right, up, down.
        let (mut vx, mut vy) = (0.0_f32, 0.0_f32);
        if intent.left { vx = -1.0; self.facing = Direction::Left; }
        if intent.right { vx = 1.0; self.facing = Direction::Right; }
        if intent.up { vy = -1.0; self.facing = Direction::Up; }
        if intent.down { vy = 1.0; self.facing = Direction::Down; }
        if vx != 0.0 && vy != 0.0 {
            vx *= DIAGONAL_SCALE;
            vy *= DIAGONAL_SCALE;
        }
        let speed = self.speed * self.speed_multiplier;

        self.prev_center = self.rect.center();
        self.rect.x += (vx * speed * dt) as i32;
        self.rect.y += (vy * speed * dt) as i32;

        if !(self.shield && self.magic > 0.0) {
            self.magic = (self.magic + MAGIC_REGEN * dt).min(MAGIC_MAX);
        }
    }

    /// Shield is up only while held and magic remains; it drains per second.
    pub fn hold_shield(&mut self, held: bool, dt: f32) {
        if held && self.magic > 0.0 {
            self.shield = true;
            self.magic = (self.magic - SHIELD_COST * dt).max(0.0);
        } else {
            self.shield = false;
        }
    }

    pub fn revert_position(&mut self) {
        let (cx, cy) = self.prev_center;
        self.rect.set_center(cx, cy);
    }

    /// Place the player and forget the pre-move position.
    pub fn place_at(&mut self, cx: i32, cy: i32) {
        self.rect.set_center(cx, cy);
        self.prev_center = (cx, cy);
    }

    /// Returns true if the hit registered.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.invuln > 0.0 {
            return false;
        }
        self.hp = (self.hp - amount).max(0);
        self.invuln = PLAYER_INVULN;
        true
    }

    pub fn start_melee(&mut self) -> bool {
        if self.melee_cooldown > 0.0 {
            return false;
        }
        self.melee_cooldown = MELEE_COOLDOWN;
        self.melee_active = MELEE_ACTIVE;
        true
    }

    /// Strike area in front of the player while a swing is active.
    pub fn melee_hitbox(&self) -> Option<Rect> {
        if self.melee_active <= 0.0 {
            return None;
        }
        let r = &self.rect;
        let half = MELEE_WIDTH / 2;
        Some(match self.facing {
            Direction::Up => Rect::new(r.center_x() - half, r.top() - MELEE_RANGE, MELEE_WIDTH, MELEE_RANGE),
            Direction::Down => Rect::new(r.center_x() - half, r.bottom(), MELEE_WIDTH, MELEE_RANGE),
            Direction::Left => Rect::new(r.left() - MELEE_RANGE, r.center_y() - half, MELEE_RANGE, MELEE_WIDTH),
            Direction::Right => Rect::new(r.right(), r.center_y() - half, MELEE_RANGE, MELEE_WIDTH),
        })
    }

    pub fn apply_speed_boots(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
        self.speed_boots_timer = SPEED_BOOTS_TIME;
    }

    /// Permanent max-hp doubling with a full heal.
    pub fn double_health(&mut self) {
        self.max_hp *= 2;
        self.hp = self.max_hp;
    }
}

// ══════════════════════════════════════════════════════════════
// Inventory / Pickups
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inventory {
    pub bombs: u32,
    pub keys: u32,
    pub arrows: u32,
}

impl Inventory {
    pub fn starting() -> Self {
        Inventory { bombs: 1, keys: 0, arrows: 5 }
    }

    pub fn use_bomb(&mut self) -> bool { take_one(&mut self.bombs) }
    pub fn use_key(&mut self) -> bool { take_one(&mut self.keys) }
    pub fn use_arrow(&mut self) -> bool { take_one(&mut self.arrows) }
}

fn take_one(count: &mut u32) -> bool {
    if *count == 0 {
        return false;
    }
    *count -= 1;
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PickupKind {
    Bomb,
    Key,
    Magic,
    Arrow,
}

const PICKUP_SIZE: i32 = 20;
const MAGIC_PICKUP: f32 = 40.0;
const ARROW_BUNDLE: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pickup {
    pub kind: PickupKind,
    pub x: i32,
    pub y: i32,
}

impl Pickup {
    pub fn new(kind: PickupKind, x: i32, y: i32) -> Self {
        Pickup { kind, x, y }
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.x, self.y, PICKUP_SIZE, PICKUP_SIZE)
    }

    pub fn apply(&self, player: &mut Player, inv: &mut Inventory) {
        match self.kind {
            PickupKind::Bomb => inv.bombs += 1,
            PickupKind::Key => inv.keys += 1,
            PickupKind::Arrow => inv.arrows += ARROW_BUNDLE,
            PickupKind::Magic => player.magic = (player.magic + MAGIC_PICKUP).min(MAGIC_MAX),
        }
    }
}

/// Pickups laid out in the starting room.
pub fn starter_pickups() -> Vec<Pickup> {
    vec![
        Pickup::new(PickupKind::Bomb, SCREEN_W / 3, SCREEN_H / 3),
        Pickup::new(PickupKind::Key, SCREEN_W / 2, SCREEN_H / 3),
        Pickup::new(PickupKind::Magic, SCREEN_W * 2 / 3, SCREEN_H / 3),
        Pickup::new(PickupKind::Arrow, SCREEN_W / 2, SCREEN_H * 2 / 3),
    ]
}

// ══════════════════════════════════════════════════════════════
// Chest
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChestItem {
    SpeedBoots,
    Companion,
    HealthDoubler,
}

impl ChestItem {
    pub fn name(self) -> &'static str {
        match self {
            ChestItem::SpeedBoots => "speed boots",
            ChestItem::Companion => "companion",
            ChestItem::HealthDoubler => "health doubler",
        }
    }
}

const CHEST_OPEN_ANIM: f32 = 0.5;
/// Chests open when the player comes within this margin.
pub const CHEST_REACH: i32 = 60;

#[derive(Clone, Debug)]
pub struct Chest {
    pub rect: Rect,
    pub opened: bool,
    pub item: Option<ChestItem>,
    pub opening_timer: f32,
}

impl Chest {
    /// `x`/`y` is the top-left corner.
    pub fn new(x: i32, y: i32) -> Self {
        Chest { rect: Rect::new(x, y, TILE, TILE), opened: false, item: None, opening_timer: 0.0 }
    }

    pub fn in_reach(&self, player: &Rect) -> bool {
        self.rect.inflate(CHEST_REACH, CHEST_REACH).overlaps(player)
    }

    /// Draw the content uniformly. Opening twice yields nothing.
    pub fn open<R: Rng>(&mut self, rng: &mut R) -> Option<ChestItem> {
        if self.opened {
            return None;
        }
        self.opened = true;
        self.opening_timer = CHEST_OPEN_ANIM;
        let item = match rng.gen_range(0..3) {
            0 => ChestItem::SpeedBoots,
            1 => ChestItem::Companion,
            _ => ChestItem::HealthDoubler,
        };
        self.item = Some(item);
        Some(item)
    }

    pub fn update(&mut self, dt: f32) {
        self.opening_timer = (self.opening_timer - dt).max(0.0);
    }
}

// ══════════════════════════════════════════════════════════════
// Projectiles
// ══════════════════════════════════════════════════════════════

pub const ARROW_SPEED: f32 = 520.0;
pub const ARROW_SIZE: i32 = 8;
pub const ARROW_DAMAGE: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct Arrow {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub alive: bool,
}

impl Arrow {
    pub fn new(cx: i32, cy: i32, dir: Direction) -> Self {
        Arrow { x: cx as f32, y: cy as f32, dir, alive: true }
    }

    pub fn update(&mut self, dt: f32) {
        let (dx, dy) = self.dir.offset();
        self.x += dx as f32 * ARROW_SPEED * dt;
        self.y += dy as f32 * ARROW_SPEED * dt;
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.x as i32, self.y as i32, ARROW_SIZE, ARROW_SIZE)
    }

    pub fn off_screen(&self) -> bool {
        self.x < 0.0 || self.x > SCREEN_W as f32 || self.y < 0.0 || self.y > SCREEN_H as f32
    }
}

pub const SPIKE_SPEED: f32 = 200.0;
pub const SPIKE_DAMAGE: f32 = 0.5;
const SPIKE_SIZE: i32 = 6;
const SPIKE_MARGIN: f32 = 50.0;

/// Companion projectile: aimed, weak, single use.
#[derive(Clone, Debug)]
pub struct Spike {
    pub x: f32,
    pub y: f32,
    pub vel: Vec2,
    pub alive: bool,
    pub damage: f32,
}

impl Spike {
    pub fn toward(from: (i32, i32), heading: Vec2) -> Self {
        Spike {
            x: from.0 as f32,
            y: from.1 as f32,
            vel: heading.normalized() * SPIKE_SPEED,
            alive: true,
            damage: SPIKE_DAMAGE,
        }
    }

    pub fn update(&mut self, dt: f32) {
        if !self.alive {
            return;
        }
        self.x += self.vel.x * dt;
        self.y += self.vel.y * dt;
        if self.x < -SPIKE_MARGIN
            || self.x > SCREEN_W as f32 + SPIKE_MARGIN
            || self.y < -SPIKE_MARGIN
            || self.y > SCREEN_H as f32 + SPIKE_MARGIN
        {
            self.alive = false;
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.x as i32, self.y as i32, SPIKE_SIZE, SPIKE_SIZE)
    }
}

// ══════════════════════════════════════════════════════════════
// Companion
// ══════════════════════════════════════════════════════════════

pub const COMPANION_LIFETIME: f32 = 10.0;
const COMPANION_RANGE: f32 = 150.0;
const COMPANION_COOLDOWN: f32 = 1.0;
const COMPANION_SPREAD: f32 = 0.3;
const COMPANION_OFFSET: (i32, i32) = (30, -20);
const COMPANION_SLACK: i32 = 5;

#[derive(Clone, Debug)]
pub struct Companion {
    pub rect: Rect,
    pub time_remaining: f32,
    pub shoot_timer: f32,
}

impl Companion {
    pub fn beside(player: &Rect) -> Self {
        let mut c = Companion {
            rect: Rect::new(0, 0, TILE / 2, TILE / 2),
            time_remaining: COMPANION_LIFETIME,
            shoot_timer: 0.0,
        };
        c.snap_to(player);
        c
    }

    pub fn active(&self) -> bool {
        self.time_remaining > 0.0
    }

    pub fn snap_to(&mut self, player: &Rect) {
        let (px, py) = player.center();
        self.rect.set_center(px + COMPANION_OFFSET.0, py + COMPANION_OFFSET.1);
    }

    /// Expire, ease toward the follow point, tick the shot cooldown.
    pub fn update(&mut self, dt: f32, player: &Rect) {
        if !self.active() {
            return;
        }
        self.time_remaining -= dt;
        if !self.active() {
            return;
        }
        let (px, py) = player.center();
        let (cx, cy) = self.rect.center();
        let dx = px + COMPANION_OFFSET.0 - cx;
        let dy = py + COMPANION_OFFSET.1 - cy;
        if dx.abs() > COMPANION_SLACK {
            self.rect.set_center_x(cx + (dx as f32 * dt) as i32);
        }
        if dy.abs() > COMPANION_SLACK {
            self.rect.set_center_y(cy + (dy as f32 * dt) as i32);
        }
        self.shoot_timer = (self.shoot_timer - dt).max(0.0);
    }

    /// Closest live enemy within range.
    pub fn nearest_target<'a>(&self, enemies: &'a [Enemy]) -> Option<&'a Enemy> {
        let me = self.rect.center();
        enemies
            .iter()
            .filter(|e| e.alive)
            .map(|e| (Vec2::between(me, e.rect.center()).length(), e))
            .filter(|(d, _)| *d <= COMPANION_RANGE)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, e)| e)
    }

    /// Fan of three spikes at `target` if off cooldown and in range.
    pub fn shoot_at(&mut self, target: &Rect) -> Vec<Spike> {
        if !self.active() || self.shoot_timer > 0.0 {
            return Vec::new();
        }
        let me = self.rect.center();
        let to = Vec2::between(me, target.center());
        if to.length() > COMPANION_RANGE {
            return Vec::new();
        }
        self.shoot_timer = COMPANION_COOLDOWN;
        let aim = to.angle();
        [aim - COMPANION_SPREAD, aim, aim + COMPANION_SPREAD]
            .into_iter()
            .map(|a| Spike::toward(me, Vec2::from_angle(a)))
            .collect()
    }
}

/// Brief marker left where an enemy died.
#[derive(Clone, Copy, Debug)]
pub struct KillFlash {
    pub rect: Rect,
    pub remaining: f32,
}

pub const KILL_FLASH_TIME: f32 = 0.15;
