/// Keyboard tracking and the game's control scheme.
///
/// `InputState` turns terminal key events into two sets per frame: keys
/// held right now and keys pressed since the last frame. When the terminal
/// does not report releases, a key stays held until no press or repeat has
/// arrived for `HOLD_TIMEOUT`.
///
/// `Action` names every control the game reacts to. `Controls` reads the
/// keyboard and the gamepad together and builds the `FrameInput` handed to
/// the simulation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::MoveIntent;
use crate::sim::step::FrameInput;
use crate::ui::gamepad::GamepadState;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ══════════════════════════════════════════════════════════════
// Actions and key bindings
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Melee,
    Shoot,
    /// Held, not edge-triggered.
    Shield,
    Bomb,
    Interact,
    Pause,
    Options,
    Restart,
    Continue,
    Confirm,
    /// Close the current screen (Esc, Backspace, pad cancel).
    Back,
    /// Esc only: leave play for the main menu, or quit from it.
    Leave,
    Save,
    Load,
}

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_MELEE: &[KeyCode] = &[KeyCode::Char('j'), KeyCode::Char('J')];
const KEYS_SHOOT: &[KeyCode] = &[KeyCode::Char('l'), KeyCode::Char('L')];
const KEYS_SHIELD: &[KeyCode] = &[KeyCode::Char('k'), KeyCode::Char('K')];
const KEYS_BOMB: &[KeyCode] = &[KeyCode::Char('b'), KeyCode::Char('B')];
const KEYS_INTERACT: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_OPTIONS: &[KeyCode] = &[KeyCode::Char('o'), KeyCode::Char('O')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONTINUE: &[KeyCode] = &[KeyCode::Char('c'), KeyCode::Char('C')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc, KeyCode::Backspace];
const KEYS_LEAVE: &[KeyCode] = &[KeyCode::Esc];
const KEYS_SAVE: &[KeyCode] = &[KeyCode::F(5)];
const KEYS_LOAD: &[KeyCode] = &[KeyCode::F(9)];

impl Action {
    pub fn keys(self) -> &'static [KeyCode] {
        match self {
            Action::Left => KEYS_LEFT,
            Action::Right => KEYS_RIGHT,
            Action::Up => KEYS_UP,
            Action::Down => KEYS_DOWN,
            Action::Melee => KEYS_MELEE,
            Action::Shoot => KEYS_SHOOT,
            Action::Shield => KEYS_SHIELD,
            Action::Bomb => KEYS_BOMB,
            Action::Interact => KEYS_INTERACT,
            Action::Pause => KEYS_PAUSE,
            Action::Options => KEYS_OPTIONS,
            Action::Restart => KEYS_RESTART,
            Action::Continue => KEYS_CONTINUE,
            Action::Confirm => KEYS_CONFIRM,
            Action::Back => KEYS_BACK,
            Action::Leave => KEYS_LEAVE,
            Action::Save => KEYS_SAVE,
            Action::Load => KEYS_LOAD,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Keyboard state
// ══════════════════════════════════════════════════════════════

pub struct InputState {
    /// Last press or repeat seen per key.
    held: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh: Vec<KeyCode>,
    interrupted: bool,
    /// Trust Release events. Only set once keyboard enhancement is active.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            held: HashMap::with_capacity(16),
            fresh: Vec::with_capacity(8),
            interrupted: false,
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking. Call once per
    /// frame, before anything queries the state.
    pub fn drain_events(&mut self) {
        self.begin_frame();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held_at(code, Instant::now())
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh.contains(&code)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.interrupted
    }

    // ── Internal ──

    fn begin_frame(&mut self) {
        self.fresh.clear();
        self.interrupted = false;
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c' | 'C')) {
            self.interrupted = true;
            return;
        }
        if key.kind == KeyEventKind::Release {
            if self.honor_release {
                self.held.remove(&key.code);
            }
            return;
        }
        if !self.held_at(key.code, now) && !self.fresh.contains(&key.code) {
            self.fresh.push(key.code);
        }
        self.held.insert(key.code, now);
    }

    fn expire(&mut self, now: Instant) {
        self.held.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.held.get(&code).is_some_and(|t| now.duration_since(*t) < HOLD_TIMEOUT)
    }
}

// ══════════════════════════════════════════════════════════════
// Controls: keyboard + gamepad per action
// ══════════════════════════════════════════════════════════════

pub struct Controls<'a> {
    kb: &'a InputState,
    gp: &'a GamepadState,
}

impl<'a> Controls<'a> {
    pub fn new(kb: &'a InputState, gp: &'a GamepadState) -> Self {
        Controls { kb, gp }
    }

    pub fn pressed(&self, action: Action) -> bool {
        action.keys().iter().any(|&k| self.kb.was_pressed(k)) || self.gp.pressed(action)
    }

    pub fn held(&self, action: Action) -> bool {
        action.keys().iter().any(|&k| self.kb.is_held(k)) || self.gp.held(action)
    }

    pub fn movement(&self) -> MoveIntent {
        MoveIntent {
            left: self.held(Action::Left),
            right: self.held(Action::Right),
            up: self.held(Action::Up),
            down: self.held(Action::Down),
        }
    }

    /// Fold this frame's action presses into `pending`. Frames run faster
    /// than ticks, so a press must survive until the next tick reads it.
    pub fn latch(&self, pending: &mut FrameInput) {
        pending.melee |= self.pressed(Action::Melee);
        pending.shoot |= self.pressed(Action::Shoot);
        pending.bomb |= self.pressed(Action::Bomb);
        pending.interact |= self.pressed(Action::Interact);
    }

    /// Input for one tick: what is held now plus the latched presses.
    pub fn frame_input(&self, pending: FrameInput) -> FrameInput {
        FrameInput {
            movement: self.movement(),
            shield: self.held(Action::Shield),
            ..pending
        }
    }

    /// Menu cursor after this frame's Up/Down, wrapping at both ends.
    pub fn nav(&self, cursor: usize, len: usize) -> usize {
        wrap_cursor(cursor, len, self.pressed(Action::Up), self.pressed(Action::Down))
    }
}

fn wrap_cursor(cursor: usize, len: usize, up: bool, down: bool) -> usize {
    if len == 0 {
        return 0;
    }
    match (up, down) {
        (true, false) => (cursor + len - 1) % len,
        (false, true) => (cursor + 1) % len,
        _ => cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn key_kind(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn repeat_does_not_count_as_a_new_press() {
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Char('j')), Instant::now());
        assert!(kb.was_pressed(KeyCode::Char('j')));
        assert!(kb.is_held(KeyCode::Char('j')));

        kb.begin_frame();
        kb.apply(key_kind(KeyCode::Char('j'), KeyEventKind::Repeat), Instant::now());
        assert!(!kb.was_pressed(KeyCode::Char('j')));
        assert!(kb.is_held(KeyCode::Char('j')));
    }

    #[test]
    fn release_is_trusted_only_with_enhancement() {
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Char('w')), Instant::now());
        kb.apply(key_kind(KeyCode::Char('w'), KeyEventKind::Release), Instant::now());
        assert!(kb.is_held(KeyCode::Char('w')));

        kb.honor_release = true;
        kb.apply(key_kind(KeyCode::Char('w'), KeyEventKind::Release), Instant::now());
        assert!(!kb.is_held(KeyCode::Char('w')));
    }

    #[test]
    fn stale_keys_expire() {
        let mut kb = InputState::new();
        let now = Instant::now();
        kb.apply(key(KeyCode::Char('w')), now - HOLD_TIMEOUT * 2);
        kb.expire(now);
        assert!(!kb.is_held(KeyCode::Char('w')));
    }

    #[test]
    fn ctrl_c_interrupts_without_pressing_c() {
        let mut kb = InputState::new();
        kb.apply(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(kb.ctrl_c_pressed());
        assert!(!kb.was_pressed(KeyCode::Char('c')));
        kb.begin_frame();
        assert!(!kb.ctrl_c_pressed());
    }

    #[test]
    fn presses_survive_until_the_tick_reads_them() {
        let gp = GamepadState::disconnected();
        let mut kb = InputState::new();
        let mut pending = FrameInput::default();

        // Frame 1: attack while starting to move up-right with the shield.
        for code in [KeyCode::Char('j'), KeyCode::Char('w'), KeyCode::Right, KeyCode::Char('k')] {
            kb.apply(key(code), Instant::now());
        }
        Controls::new(&kb, &gp).latch(&mut pending);

        // Frame 2: nothing new, keys still held.
        kb.begin_frame();
        let ctl = Controls::new(&kb, &gp);
        ctl.latch(&mut pending);
        let input = ctl.frame_input(pending);

        assert!(input.melee);
        assert!(!input.shoot && !input.bomb && !input.interact);
        assert!(input.shield);
        assert!(input.movement.up && input.movement.right);
        assert!(!input.movement.left && !input.movement.down);
    }

    #[test]
    fn escape_is_both_leave_and_back() {
        let gp = GamepadState::disconnected();
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Esc), Instant::now());
        let ctl = Controls::new(&kb, &gp);
        assert!(ctl.pressed(Action::Leave) && ctl.pressed(Action::Back));

        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Backspace), Instant::now());
        let ctl = Controls::new(&kb, &gp);
        assert!(ctl.pressed(Action::Back));
        assert!(!ctl.pressed(Action::Leave));
    }

    #[test]
    fn cursor_wraps_both_ways() {
        assert_eq!(wrap_cursor(0, 3, true, false), 2);
        assert_eq!(wrap_cursor(2, 3, false, true), 0);
        assert_eq!(wrap_cursor(1, 3, true, true), 1);
        assert_eq!(wrap_cursor(0, 0, false, true), 0);
    }

    #[test]
    fn nav_follows_arrow_keys() {
        let gp = GamepadState::disconnected();
        let mut kb = InputState::new();
        kb.apply(key(KeyCode::Down), Instant::now());
        assert_eq!(Controls::new(&kb, &gp).nav(2, 3), 0);
    }
}
