/// WorldState: everything the running program knows.
///
/// ## Layers
///
///   - `WorldState`: scene-host state. Which phase we are in, the pause
///     and options menus, persisted options, HUD message.
///   - `PlayState`: one run of the dungeon. Rebuilt from scratch on
///     "new game"; the simulation (`step`) only ever touches this.
///
/// ## Room entities
///
/// Enemies and chests are owned by their `Room` inside the `Dungeon`.
/// The simulation works on `dungeon.current_room_mut().enemies` directly,
/// so a dead enemy dropped there is gone for good. Pickups, projectiles
/// and flashes belong to the scene and are cleared on room switch.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ActiveBalance, Difficulty, GameConfig};
use crate::domain::entity::{
    starter_pickups, Arrow, Companion, Inventory, KillFlash, Pickup, Player, Spike,
};
use crate::domain::geom::{SCREEN_H, SCREEN_W};
use crate::domain::room::{Direction, RoomGeometry};
use crate::sim::dungeon::Dungeon;
use crate::sim::save::Options;
use crate::sim::spawn;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Menu,
    Playing,
    GameOver,
}

// ══════════════════════════════════════════════════════════════
// Transition state machine
// ══════════════════════════════════════════════════════════════

pub const ROOM_FADE_OUT: f32 = 0.18;
pub const ROOM_FADE_IN: f32 = 0.15;
pub const GAME_OVER_FADE: f32 = 0.25;
pub const DOOR_COOLDOWN: f32 = 0.25;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FadeTarget {
    Room(Direction),
    GameOver,
}

/// Idle → FadingOut → (room switch) → FadingIn → Idle.
/// A game-over fade ends in `Finished`; nothing leaves that state.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Transition {
    Idle,
    FadingOut { target: FadeTarget, elapsed: f32 },
    FadingIn { elapsed: f32 },
    Finished,
}

impl Transition {
    pub fn is_idle(&self) -> bool {
        matches!(self, Transition::Idle)
    }

    /// Screen darkness in 0..=1 for the renderer.
    pub fn darkness(&self) -> f32 {
        match *self {
            Transition::Idle => 0.0,
            Transition::FadingOut { target, elapsed } => {
                let total = match target {
                    FadeTarget::Room(_) => ROOM_FADE_OUT,
                    FadeTarget::GameOver => GAME_OVER_FADE,
                };
                (elapsed / total).clamp(0.0, 1.0)
            }
            Transition::FadingIn { elapsed } => 1.0 - (elapsed / ROOM_FADE_IN).clamp(0.0, 1.0),
            Transition::Finished => 1.0,
        }
    }
}

/// Screen shake: remaining time and pixel amplitude.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shake {
    pub time: f32,
    pub intensity: i32,
}

impl Shake {
    pub fn kick(&mut self, time: f32, intensity: i32) {
        self.time = self.time.max(time);
        self.intensity = self.intensity.max(intensity);
    }

    pub fn decay(&mut self, dt: f32) {
        if self.time > 0.0 {
            self.time = (self.time - dt).max(0.0);
            if self.time == 0.0 {
                self.intensity = 0;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Play state
// ══════════════════════════════════════════════════════════════

pub struct PlayState {
    // ── Entities ──
    pub player: Player,
    pub inventory: Inventory,
    pub dungeon: Dungeon,
    pub arrows: Vec<Arrow>,
    pub spikes: Vec<Spike>,
    pub pickups: Vec<Pickup>,
    pub companion: Option<Companion>,

    // ── Current room geometry (walls + obstacles), rebuilt on entry ──
    pub geometry: RoomGeometry,

    // ── Items owned this run ──
    pub has_speed_boots: bool,
    pub health_doubled: bool,

    // ── Transition ──
    pub transition: Transition,
    pub door_cooldown: f32,
    /// Set on arrival; door triggers stay dead until the player has
    /// stepped off every door zone.
    pub door_rearm: bool,

    // ── Feedback (no gameplay effect) ──
    pub shake: Shake,
    pub door_feedback: f32,
    pub kill_flashes: Vec<KillFlash>,

    // ── Balance / randomness ──
    pub balance: ActiveBalance,
    pub rng: StdRng,
}

impl PlayState {
    /// Fresh run: new dungeon, player in the middle of the start room,
    /// starter pickups laid out, the start room entered.
    pub fn new(config: &GameConfig, difficulty: Difficulty, seed: u64) -> Self {
        let mut play = PlayState {
            player: Player::new(SCREEN_W / 2, SCREEN_H / 2),
            inventory: Inventory::starting(),
            dungeon: Dungeon::new(),
            arrows: vec![],
            spikes: vec![],
            pickups: starter_pickups(),
            companion: None,
            geometry: RoomGeometry::default(),
            has_speed_boots: false,
            health_doubled: false,
            transition: Transition::Idle,
            door_cooldown: 0.0,
            door_rearm: false,
            shake: Shake::default(),
            door_feedback: 0.0,
            kill_flashes: vec![],
            balance: config.balance_for(difficulty),
            rng: StdRng::seed_from_u64(seed),
        };
        spawn::enter_room(&mut play);
        play
    }

    /// Swap the balance in effect; the room's obstacle layout follows.
    pub fn set_balance(&mut self, balance: ActiveBalance) {
        self.balance = balance;
        self.geometry = RoomGeometry::for_room(self.dungeon.current(), &self.balance.obstacles);
    }

    pub fn is_game_over(&self) -> bool {
        matches!(
            self.transition,
            Transition::FadingOut { target: FadeTarget::GameOver, .. } | Transition::Finished
        )
    }
}

// ══════════════════════════════════════════════════════════════
// Scene host state
// ══════════════════════════════════════════════════════════════

pub const MENU_ITEMS: [&str; 3] = ["New game", "Continue", "Quit"];
pub const PAUSE_ITEMS: [&str; 3] = ["Continue", "Save", "Quit to menu"];
pub const OPTION_ITEMS: [&str; 3] = ["Sound", "Volume", "Difficulty"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PauseMenu {
    Closed,
    Main { cursor: usize },
    Options { cursor: usize },
}

pub struct WorldState {
    pub phase: Phase,
    pub play: Option<PlayState>,
    pub pause: PauseMenu,
    pub options: Options,
    pub menu_cursor: usize,
    pub has_save: bool,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,
}

impl WorldState {
    pub fn new(options: Options) -> Self {
        WorldState {
            phase: Phase::Menu,
            play: None,
            pause: PauseMenu::Closed,
            options,
            menu_cursor: 0,
            has_save: false,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
        }
    }

    pub fn paused(&self) -> bool {
        self.pause != PauseMenu::Closed
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> GameConfig {
        GameConfig::parse("", Path::new(".")).unwrap()
    }

    #[test]
    fn new_run_populates_start_room() {
        let play = PlayState::new(&config(), Difficulty::Normal, 1);
        let room = play.dungeon.current_room();
        assert!(room.spawned);
        assert_eq!(room.enemies.len(), 2);
        assert_eq!(play.pickups.len(), 4);
        assert_eq!(play.geometry.walls.len(), 4);
        // Live enemies keep unlocked doors shut.
        assert!(!room.door(Direction::Up).open);
    }

    #[test]
    fn shake_keeps_the_stronger_kick() {
        let mut s = Shake::default();
        s.kick(0.15, 4);
        s.kick(0.25, 6);
        s.kick(0.1, 2);
        assert_eq!(s, Shake { time: 0.25, intensity: 6 });
        s.decay(0.3);
        assert_eq!(s, Shake::default());
    }

    #[test]
    fn darkness_follows_fades() {
        assert_eq!(Transition::Idle.darkness(), 0.0);
        let half = Transition::FadingOut { target: FadeTarget::Room(Direction::Up), elapsed: ROOM_FADE_OUT / 2.0 };
        assert!((half.darkness() - 0.5).abs() < 1e-6);
        assert_eq!(Transition::FadingIn { elapsed: 0.0 }.darkness(), 1.0);
        assert_eq!(Transition::Finished.darkness(), 1.0);
    }

    #[test]
    fn difficulty_change_rebuilds_geometry() {
        let cfg = config();
        let mut play = PlayState::new(&cfg, Difficulty::Normal, 1);
        let before = play.geometry.obstacles.len();
        play.set_balance(cfg.balance_for(Difficulty::Easy));
        assert!(play.geometry.obstacles.len() <= before);
        assert_eq!(play.balance.difficulty, Difficulty::Easy);
    }
}
