/// Gamepad input via gilrs, reported per `Action`.
///
/// Button bindings come from the `[gamepad]` section of config.toml.
/// Defaults:
///   D-pad / Left Stick    →  Movement and menu navigation
///   X                     →  Melee
///   Y                     →  Arrow
///   R1 / R2               →  Shield (held)
///   L1                    →  Bomb
///   A                     →  Interact / Confirm
///   Start                 →  Pause / Confirm / Restart
///   B / Select            →  Back
///
/// Without the "gamepad" feature, or when gilrs cannot start, the pad
/// stays disconnected and every query answers false.

use std::collections::HashMap;

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::ui::input::Action;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Direction slots shared by the d-pad and the stick.
const DIRECTIONS: [Action; 4] = [Action::Left, Action::Right, Action::Up, Action::Down];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER" => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2" => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2 => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    #[cfg_attr(not(any(feature = "gamepad", test)), allow(dead_code))]
    fn set(&mut self, down: bool) {
        self.just_pressed |= down && !self.held;
        self.held = down;
    }
}

fn default_bindings() -> HashMap<Action, Vec<Btn>> {
    HashMap::from([
        (Action::Melee, vec![Btn::X]),
        (Action::Shoot, vec![Btn::Y]),
        (Action::Shield, vec![Btn::R1, Btn::R2]),
        (Action::Bomb, vec![Btn::L1]),
        (Action::Interact, vec![Btn::A]),
        (Action::Pause, vec![Btn::Start]),
        (Action::Restart, vec![Btn::Start]),
        (Action::Confirm, vec![Btn::A, Btn::Start]),
        (Action::Back, vec![Btn::B, Btn::Select]),
    ])
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],
    /// Indexed like `DIRECTIONS`.
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_y: f32,

    bindings: HashMap<Action, Vec<Btn>>,
}

impl GamepadState {
    #[cfg(feature = "gamepad")]
    pub fn new() -> Self {
        match Gilrs::new() {
            Ok(g) => GamepadState { gilrs: Some(g), ..Self::disconnected() },
            Err(e) => {
                tracing::info!(error = %e, "gamepad support unavailable");
                Self::disconnected()
            }
        }
    }

    #[cfg(not(feature = "gamepad"))]
    pub fn new() -> Self {
        Self::disconnected()
    }

    /// A pad that never reports input.
    pub fn disconnected() -> Self {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            bindings: default_bindings(),
        }
    }

    /// Apply `[gamepad]` bindings. An action whose names all fail to parse
    /// keeps its default buttons.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let entries = [
            (Action::Melee, &cfg.melee),
            (Action::Shoot, &cfg.shoot),
            (Action::Shield, &cfg.shield),
            (Action::Bomb, &cfg.bomb),
            (Action::Interact, &cfg.interact),
            (Action::Pause, &cfg.pause),
            (Action::Confirm, &cfg.confirm),
            (Action::Back, &cfg.cancel),
        ];
        for (action, names) in entries {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if !parsed.is_empty() {
                self.bindings.insert(action, parsed);
            } else if !names.is_empty() {
                tracing::warn!(?action, ?names, "no usable gamepad buttons, keeping defaults");
            }
        }
    }

    /// Start a new frame: clear edges, then read pending pad events.
    pub fn update(&mut self) {
        for s in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            s.just_pressed = false;
        }
        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    pub fn pressed(&self, action: Action) -> bool {
        match direction_slot(action) {
            Some(i) => self.dpad[i].just_pressed || self.stick[i].just_pressed,
            None => self.bound(action).any(|s| s.just_pressed),
        }
    }

    pub fn held(&self, action: Action) -> bool {
        match direction_slot(action) {
            Some(i) => self.dpad[i].held || self.stick[i].held,
            None => self.bound(action).any(|s| s.held),
        }
    }

    // ── Internal ──

    fn bound(&self, action: Action) -> impl Iterator<Item = &BtnState> + '_ {
        self.bindings
            .get(&action)
            .into_iter()
            .flatten()
            .map(move |&b| &self.buttons[b as usize])
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else { return };
        let events: Vec<EventType> = std::iter::from_fn(|| gilrs.next_event()).map(|e| e.event).collect();

        for event in events {
            match event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, v, _) => self.stick_x = v,
                EventType::AxisChanged(Axis::LeftStickY, v, _) => self.stick_y = v,
                EventType::Disconnected => self.release_all(),
                _ => {}
            }
        }

        let (x, y) = (self.stick_x, self.stick_y);
        let want = [x < -STICK_DEADZONE, x > STICK_DEADZONE, y > STICK_DEADZONE, y < -STICK_DEADZONE];
        for (slot, down) in self.stick.iter_mut().zip(want) {
            slot.set(down);
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, btn: Button, down: bool) {
        let dpad = match btn {
            Button::DPadLeft => Some(0),
            Button::DPadRight => Some(1),
            Button::DPadUp => Some(2),
            Button::DPadDown => Some(3),
            _ => None,
        };
        if let Some(i) = dpad {
            self.dpad[i].set(down);
        } else if let Some(b) = Btn::from_gilrs(btn) {
            self.buttons[b as usize].set(down);
        }
    }

    #[cfg(feature = "gamepad")]
    fn release_all(&mut self) {
        for s in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *s = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

fn direction_slot(action: Action) -> Option<usize> {
    DIRECTIONS.iter().position(|&d| d == action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> GamepadConfig {
        GamepadConfig {
            melee: vec!["lb".into()],
            shoot: vec![],
            shield: vec!["nonsense".into()],
            bomb: vec![],
            interact: vec![],
            pause: vec![],
            confirm: vec![],
            cancel: vec![],
        }
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("Rt"), Some(Btn::R2));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("Z"), None);
    }

    #[test]
    fn config_overrides_only_parsable_actions() {
        let mut gp = GamepadState::disconnected();
        gp.load_button_config(&cfg());
        assert_eq!(gp.bindings[&Action::Melee], vec![Btn::L1]);
        assert_eq!(gp.bindings[&Action::Shield], vec![Btn::R1, Btn::R2]);
        assert_eq!(gp.bindings[&Action::Shoot], vec![Btn::Y]);
    }

    #[test]
    fn press_and_hold_queries() {
        let mut gp = GamepadState::disconnected();
        gp.buttons[Btn::X as usize].set(true);
        gp.buttons[Btn::R1 as usize].set(true);
        assert!(gp.pressed(Action::Melee));
        assert!(gp.held(Action::Shield));
        assert!(!gp.pressed(Action::Shoot));
        gp.update();
        assert!(!gp.pressed(Action::Melee));
        assert!(gp.held(Action::Shield));
    }

    #[test]
    fn dpad_drives_direction_actions() {
        let mut gp = GamepadState::disconnected();
        gp.dpad[2].set(true);
        assert!(gp.pressed(Action::Up));
        assert!(gp.held(Action::Up));
        assert!(!gp.held(Action::Down));
        // Keyboard-only actions are never bound.
        assert!(!gp.pressed(Action::Save));
    }

    #[test]
    fn start_both_pauses_and_restarts() {
        let mut gp = GamepadState::disconnected();
        gp.buttons[Btn::Start as usize].set(true);
        assert!(gp.pressed(Action::Pause));
        assert!(gp.pressed(Action::Restart));
        assert!(gp.pressed(Action::Confirm));
    }
}
