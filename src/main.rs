/// Entry point, game loop and scene host (menu / play / pause / game over).

mod config;
mod domain;
mod sim;
mod ui;

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::event::GameEvent;
use sim::save::{self, Options};
use sim::step::{self, FrameInput};
use sim::world::{PauseMenu, Phase, PlayState, WorldState, MENU_ITEMS, OPTION_ITEMS, PAUSE_ITEMS};
use ui::gamepad::GamepadState;
use ui::input::{Action, Controls, InputState};
use ui::renderer::Renderer;
use ui::sound::{Cue, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "isac.log";
const MESSAGE_TICKS: u32 = 120;

fn main() {
    init_logging(&config::default_data_dir());
    let config = GameConfig::load();

    let options = match save::load_options(&save::options_path(&config.data_dir)) {
        Ok(o) => o,
        Err(e) => {
            tracing::info!(error = %e, "no usable options file, using defaults");
            Options::default()
        }
    };
    let mut world = WorldState::new(options);
    world.has_save = save::has_save(&config.data_dir);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut sound = SoundEngine::new();
    if let Some(sfx) = sound.as_mut() {
        sfx.set_volume(world.options.output_volume());
    }

    let result = game_loop(&mut world, &mut renderer, &mut sound, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Isac!");
}

/// The terminal is in raw mode while playing, so logs go to a file.
/// If it cannot be created, logging stays off.
fn init_logging(data_dir: &Path) {
    if std::fs::create_dir_all(data_dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(data_dir.join(LOG_FILE)) else { return };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: &mut Option<SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.enable_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let dt = config.timing.dt();

    // Edge presses seen between ticks, consumed by the next tick.
    let mut pending = FrameInput::default();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        let ctl = Controls::new(&kb, &gp);
        if handle_meta(world, sound, &ctl, config) {
            break;
        }

        let in_play = world.phase == Phase::Playing && !world.paused();
        if in_play {
            ctl.latch(&mut pending);
        } else {
            pending = FrameInput::default();
        }

        if last_tick.elapsed() >= tick_rate {
            world.anim_tick = world.anim_tick.wrapping_add(1);
            if in_play {
                let input = ctl.frame_input(pending);
                pending = FrameInput::default();
                let events = match world.play.as_mut() {
                    Some(play) => step::step(play, input, dt),
                    None => Vec::new(),
                };
                process_sound_events(sound.as_ref(), &events);
                if events.contains(&GameEvent::GameOver) {
                    world.phase = Phase::GameOver;
                    world.pause = PauseMenu::Closed;
                }
            }
            world.tick_message();
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::DoorOpened | GameEvent::DoorUnlocked { .. } => sfx.play(Cue::DoorOpen),
            GameEvent::ArrowShot => sfx.play(Cue::ArrowShot),
            GameEvent::ArrowHit => sfx.play(Cue::ArrowHit),
            GameEvent::EnemyKilled { .. } => sfx.play(Cue::EnemyDeath),
            GameEvent::PlayerHurt { .. } => sfx.play(Cue::PlayerHurt),
            GameEvent::PickedUp { .. } | GameEvent::ChestOpened { .. } => sfx.play(Cue::Pickup),
            GameEvent::ChargeStarted => sfx.play(Cue::ChargeStart),
            GameEvent::BombExploded => sfx.play(Cue::Explosion),
            _ => {}
        }
    }
}

// ── Scene transitions ──

fn new_seed() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

fn start_new_game(world: &mut WorldState, config: &GameConfig) {
    let seed = new_seed();
    tracing::info!(seed, difficulty = world.options.difficulty.name(), "new run");
    world.play = Some(PlayState::new(config, world.options.difficulty, seed));
    world.phase = Phase::Playing;
    world.pause = PauseMenu::Closed;
    world.message.clear();
    world.message_timer = 0;
}

fn return_to_menu(world: &mut WorldState, config: &GameConfig) {
    world.play = None;
    world.phase = Phase::Menu;
    world.pause = PauseMenu::Closed;
    world.menu_cursor = 0;
    world.has_save = save::has_save(&config.data_dir);
}

fn save_current(world: &mut WorldState, config: &GameConfig) {
    let Some(play) = world.play.as_ref() else { return };
    let path = save::save_path(&config.data_dir);
    match save::save_game(&path, &play.player, &play.inventory, &play.dungeon) {
        Ok(()) => {
            world.has_save = true;
            world.set_message("Game saved", MESSAGE_TICKS);
        }
        Err(e) => {
            tracing::warn!(error = %e, "save failed");
            world.set_message("Save failed!", MESSAGE_TICKS);
        }
    }
}

/// Load the save file into the running play state. Returns false (and
/// leaves the run untouched) when there is nothing usable to load.
fn load_current(world: &mut WorldState, config: &GameConfig) -> bool {
    let Some(play) = world.play.as_mut() else { return false };
    let path = save::save_path(&config.data_dir);
    let previous = play.dungeon.current();
    match save::load_game(&path, &mut play.player, &mut play.inventory, &mut play.dungeon) {
        Ok(()) => {
            step::resume_after_load(play, previous);
            world.set_message("Game loaded", MESSAGE_TICKS);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "load failed");
            world.set_message("No save to load", MESSAGE_TICKS);
            false
        }
    }
}

fn continue_game(world: &mut WorldState, config: &GameConfig) {
    if !world.has_save {
        world.set_message("No save found", MESSAGE_TICKS);
        return;
    }
    start_new_game(world, config);
    if !load_current(world, config) {
        return_to_menu(world, config);
        world.set_message("Save could not be read", MESSAGE_TICKS);
    }
}

fn set_paused(world: &mut WorldState, sound: Option<&SoundEngine>, open: bool) {
    world.pause = if open { PauseMenu::Main { cursor: 0 } } else { PauseMenu::Closed };
    if let Some(sfx) = sound {
        sfx.play(if open { Cue::PauseOpen } else { Cue::PauseClose });
    }
}

// ── Options ──

/// Apply a change to one options entry. `delta` is -1/+1 for left/right;
/// 0 means Enter (toggle / wrap / cycle forward).
fn adjust_option(world: &mut WorldState, sound: &mut Option<SoundEngine>, config: &GameConfig, item: usize, delta: i32) {
    let opts = &mut world.options;
    match OPTION_ITEMS.get(item).copied() {
        Some("Sound") => opts.sound_enabled = !opts.sound_enabled,
        Some("Volume") => match delta {
            0 => opts.cycle_volume(),
            s => opts.nudge_volume(s as f32 * save::VOLUME_STEP),
        },
        Some("Difficulty") => {
            opts.difficulty = opts.difficulty.cycle(if delta < 0 { -1 } else { 1 });
            if let Some(play) = world.play.as_mut() {
                play.set_balance(config.balance_for(world.options.difficulty));
            }
        }
        _ => return,
    }

    if let Some(sfx) = sound.as_mut() {
        sfx.set_volume(world.options.output_volume());
    }
    let o = &world.options;
    tracing::info!(sound = o.sound_enabled, volume = o.volume, difficulty = o.difficulty.name(), "options changed");
    if let Err(e) = save::save_options(&save::options_path(&config.data_dir), o) {
        tracing::warn!(error = %e, "could not persist options");
    }
}

// ── Meta input (scene host) ──

/// Returns true when the program should quit.
fn handle_meta(
    world: &mut WorldState,
    sound: &mut Option<SoundEngine>,
    ctl: &Controls,
    config: &GameConfig,
) -> bool {
    match world.phase {
        Phase::Menu => {
            world.menu_cursor = ctl.nav(world.menu_cursor, MENU_ITEMS.len());
            if ctl.pressed(Action::Back) {
                return true;
            }
            if ctl.pressed(Action::Continue) {
                continue_game(world, config);
            } else if ctl.pressed(Action::Confirm) {
                match world.menu_cursor {
                    0 => start_new_game(world, config),
                    1 => continue_game(world, config),
                    _ => return true,
                }
            }
            false
        }

        Phase::GameOver => {
            if ctl.pressed(Action::Restart) {
                start_new_game(world, config);
            } else if ctl.pressed(Action::Confirm) {
                return_to_menu(world, config);
            } else if ctl.pressed(Action::Back) {
                return true;
            }
            false
        }

        Phase::Playing => {
            match world.pause {
                PauseMenu::Closed => {
                    if ctl.pressed(Action::Leave) {
                        return_to_menu(world, config);
                    } else if ctl.pressed(Action::Pause) {
                        set_paused(world, sound.as_ref(), true);
                    } else if ctl.pressed(Action::Save) {
                        save_current(world, config);
                    } else if ctl.pressed(Action::Load) {
                        load_current(world, config);
                    }
                }
                PauseMenu::Main { cursor } => {
                    let cursor = ctl.nav(cursor, PAUSE_ITEMS.len());
                    world.pause = PauseMenu::Main { cursor };
                    if ctl.pressed(Action::Leave) {
                        return_to_menu(world, config);
                    } else if ctl.pressed(Action::Pause) || ctl.pressed(Action::Back) {
                        set_paused(world, sound.as_ref(), false);
                    } else if ctl.pressed(Action::Options) {
                        world.pause = PauseMenu::Options { cursor: 0 };
                    } else if ctl.pressed(Action::Confirm) {
                        match PAUSE_ITEMS[cursor] {
                            "Continue" => set_paused(world, sound.as_ref(), false),
                            "Save" => save_current(world, config),
                            _ => return_to_menu(world, config),
                        }
                    }
                }
                PauseMenu::Options { cursor } => {
                    let cursor = ctl.nav(cursor, OPTION_ITEMS.len());
                    world.pause = PauseMenu::Options { cursor };
                    if ctl.pressed(Action::Pause) {
                        set_paused(world, sound.as_ref(), false);
                    } else if ctl.pressed(Action::Back) || ctl.pressed(Action::Options) {
                        world.pause = PauseMenu::Main { cursor: 0 };
                    } else if ctl.pressed(Action::Left) {
                        adjust_option(world, sound, config, cursor, -1);
                    } else if ctl.pressed(Action::Right) {
                        adjust_option(world, sound, config, cursor, 1);
                    } else if ctl.pressed(Action::Confirm) {
                        adjust_option(world, sound, config, cursor, 0);
                    }
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> GameConfig {
        GameConfig::parse("", dir).unwrap()
    }

    #[test]
    fn save_then_continue_restores_room() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let mut world = WorldState::new(Options::default());

        start_new_game(&mut world, &cfg);
        {
            let play = world.play.as_mut().unwrap();
            play.inventory.keys = 3;
            assert!(play.dungeon.set_current((0, 1)));
        }
        save_current(&mut world, &cfg);
        assert!(world.has_save);

        return_to_menu(&mut world, &cfg);
        assert!(world.play.is_none());
        assert!(world.has_save);

        continue_game(&mut world, &cfg);
        assert_eq!(world.phase, Phase::Playing);
        let play = world.play.as_ref().unwrap();
        assert_eq!(play.inventory.keys, 3);
        assert_eq!(play.dungeon.current(), (0, 1));
        assert!(play.dungeon.current_room().spawned);
    }

    #[test]
    fn continue_without_save_stays_in_menu() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let mut world = WorldState::new(Options::default());
        continue_game(&mut world, &cfg);
        assert_eq!(world.phase, Phase::Menu);
        assert!(world.play.is_none());
        assert!(!world.message.is_empty());
    }

    #[test]
    fn option_changes_are_persisted() {
        let dir = tempdir().unwrap();
        let cfg = config_in(dir.path());
        let mut world = WorldState::new(Options::default());
        let mut sound: Option<SoundEngine> = None;
        start_new_game(&mut world, &cfg);

        adjust_option(&mut world, &mut sound, &cfg, 0, 0);
        adjust_option(&mut world, &mut sound, &cfg, 1, -1);
        adjust_option(&mut world, &mut sound, &cfg, 2, 1);

        let saved = save::load_options(&save::options_path(dir.path())).unwrap();
        assert!(!saved.sound_enabled);
        assert_eq!(saved.volume, 0.6);
        assert_eq!(saved.difficulty, config::Difficulty::Hard);
        assert_eq!(world.play.as_ref().unwrap().balance.difficulty, config::Difficulty::Hard);
    }
}
