/// Save and load: the game snapshot and the options document.
///
/// ## File format
///   Pretty-printed JSON via serde_json.
///
///   savegame.json:
///     {"player": {"hp", "max_hp", "magic", "pos": [x, y]},
///      "inventory": {"bombs", "keys", "arrows"},
///      "dungeon": {"current": [gx, gy]}}
///
///   options.json:
///     {"options": {"sound_enabled", "volume", "difficulty"}}
///
/// Loading is tolerant: every field is optional and a missing one keeps
/// the in-memory value. A document that cannot be read or parsed is an
/// error and nothing is touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::Difficulty;
use crate::domain::entity::{Inventory, Player, MAGIC_MAX};
use crate::sim::dungeon::Dungeon;

const SAVE_FILE: &str = "savegame.json";
const OPTIONS_FILE: &str = "options.json";
pub const VOLUME_STEP: f32 = 0.1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

pub fn save_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SAVE_FILE)
}

pub fn options_path(data_dir: &Path) -> PathBuf {
    data_dir.join(OPTIONS_FILE)
}

pub fn has_save(data_dir: &Path) -> bool {
    save_path(data_dir).is_file()
}

fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, text)?;
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Game snapshot
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Debug, Default)]
struct GameDoc {
    #[serde(default)]
    player: PlayerDoc,
    #[serde(default)]
    inventory: InventoryDoc,
    #[serde(default)]
    dungeon: DungeonDoc,
}

/// Counts and coordinates are written as integers but read from any JSON
/// number, truncated toward zero (`2.9` reads as `2`, `-0.5` as `0`).
#[derive(Serialize, Deserialize, Debug, Default)]
struct PlayerDoc {
    #[serde(default, deserialize_with = "lenient_int")]
    hp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    max_hp: Option<i64>,
    magic: Option<f32>,
    /// Player centre.
    pos: Option<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct InventoryDoc {
    #[serde(default, deserialize_with = "lenient_int")]
    bombs: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    keys: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    arrows: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct DungeonDoc {
    #[serde(default, deserialize_with = "lenient_ints")]
    current: Option<Vec<i64>>,
}

fn lenient_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v: Option<f64> = Option::deserialize(d)?;
    Ok(v.map(|x| x.trunc() as i64))
}

fn lenient_ints<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<i64>>, D::Error> {
    let v: Option<Vec<f64>> = Option::deserialize(d)?;
    Ok(v.map(|xs| xs.into_iter().map(|x| x.trunc() as i64).collect()))
}

fn to_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn to_count(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}

fn capture(player: &Player, inv: &Inventory, dungeon: &Dungeon) -> GameDoc {
    let (cx, cy) = player.rect.center();
    let (gx, gy) = dungeon.current();
    GameDoc {
        player: PlayerDoc {
            hp: Some(player.hp.into()),
            max_hp: Some(player.max_hp.into()),
            magic: Some(player.magic),
            pos: Some(vec![cx as f64, cy as f64]),
        },
        inventory: InventoryDoc {
            bombs: Some(inv.bombs.into()),
            keys: Some(inv.keys.into()),
            arrows: Some(inv.arrows.into()),
        },
        dungeon: DungeonDoc { current: Some(vec![gx.into(), gy.into()]) },
    }
}

fn restore(doc: &GameDoc, player: &mut Player, inv: &mut Inventory, dungeon: &mut Dungeon) {
    let p = &doc.player;
    if let Some(max_hp) = p.max_hp {
        player.max_hp = to_i32(max_hp).max(1);
    }
    if let Some(hp) = p.hp {
        player.hp = to_i32(hp).clamp(0, player.max_hp);
    }
    if let Some(magic) = p.magic {
        player.magic = magic.clamp(0.0, MAGIC_MAX);
    }
    if let Some([x, y]) = p.pos.as_deref() {
        player.place_at(x.round() as i32, y.round() as i32);
    }

    let i = &doc.inventory;
    inv.bombs = i.bombs.map_or(inv.bombs, to_count);
    inv.keys = i.keys.map_or(inv.keys, to_count);
    inv.arrows = i.arrows.map_or(inv.arrows, to_count);

    if let Some(&[gx, gy]) = doc.dungeon.current.as_deref() {
        let (gx, gy) = (to_i32(gx), to_i32(gy));
        if !dungeon.set_current((gx, gy)) {
            tracing::warn!(room = ?(gx, gy), "saved room does not exist, keeping current");
        }
    }
}

pub fn save_game(path: &Path, player: &Player, inv: &Inventory, dungeon: &Dungeon) -> Result<(), PersistError> {
    write_document(path, &capture(player, inv, dungeon))?;
    tracing::info!(path = %path.display(), "game saved");
    Ok(())
}

/// Parse first, then apply: on `Err` nothing has been modified.
pub fn load_game(
    path: &Path,
    player: &mut Player,
    inv: &mut Inventory,
    dungeon: &mut Dungeon,
) -> Result<(), PersistError> {
    let text = std::fs::read_to_string(path)?;
    let doc: GameDoc = serde_json::from_str(&text)?;
    restore(&doc, player, inv, dungeon);
    tracing::info!(path = %path.display(), "game loaded");
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    pub sound_enabled: bool,
    pub volume: f32,
    pub difficulty: Difficulty,
}

impl Default for Options {
    fn default() -> Self {
        Options { sound_enabled: true, volume: 0.7, difficulty: Difficulty::Normal }
    }
}

impl Options {
    /// Effective playback volume.
    pub fn output_volume(&self) -> f32 {
        if self.sound_enabled { self.volume } else { 0.0 }
    }

    /// Step the volume, clamped and rounded to two decimals.
    pub fn nudge_volume(&mut self, delta: f32) {
        self.volume = ((self.volume + delta).clamp(0.0, 1.0) * 100.0).round() / 100.0;
    }

    /// One step up, wrapping to silence past full.
    pub fn cycle_volume(&mut self) {
        if self.volume >= 1.0 {
            self.volume = 0.0;
        } else {
            self.nudge_volume(VOLUME_STEP);
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct OptionsDoc {
    #[serde(default)]
    options: OptionsBody,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct OptionsBody {
    sound_enabled: Option<bool>,
    volume: Option<f32>,
    difficulty: Option<String>,
}

pub fn save_options(path: &Path, opts: &Options) -> Result<(), PersistError> {
    let doc = OptionsDoc {
        options: OptionsBody {
            sound_enabled: Some(opts.sound_enabled),
            volume: Some(opts.volume.clamp(0.0, 1.0)),
            difficulty: Some(opts.difficulty.name().to_string()),
        },
    };
    write_document(path, &doc)
}

/// Missing keys take the defaults, volume is clamped, an unknown
/// difficulty falls back to Normal.
pub fn load_options(path: &Path) -> Result<Options, PersistError> {
    let text = std::fs::read_to_string(path)?;
    let doc: OptionsDoc = serde_json::from_str(&text)?;
    let defaults = Options::default();
    let body = doc.options;
    Ok(Options {
        sound_enabled: body.sound_enabled.unwrap_or(defaults.sound_enabled),
        volume: body.volume.unwrap_or(defaults.volume).clamp(0.0, 1.0),
        difficulty: body
            .difficulty
            .as_deref()
            .and_then(Difficulty::parse)
            .unwrap_or(defaults.difficulty),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::Direction;
    use tempfile::tempdir;

    #[test]
    fn game_round_trip() {
        let dir = tempdir().unwrap();
        let path = save_path(dir.path());

        let mut player = Player::new(400, 300);
        player.hp = 2;
        player.max_hp = 3;
        player.magic = 55.5;
        player.place_at(120, 340);
        let inv = Inventory { bombs: 2, keys: 1, arrows: 7 };
        let mut dungeon = Dungeon::new();
        assert!(dungeon.move_through(Direction::Up));

        save_game(&path, &player, &inv, &dungeon).unwrap();

        let mut p2 = Player::new(400, 300);
        let mut inv2 = Inventory::starting();
        let mut d2 = Dungeon::new();
        load_game(&path, &mut p2, &mut inv2, &mut d2).unwrap();

        assert_eq!(p2.hp, 2);
        assert_eq!(p2.max_hp, 3);
        assert_eq!(p2.magic, 55.5);
        assert_eq!(p2.rect.center(), (120, 340));
        assert_eq!(inv2, inv);
        assert_eq!(d2.current(), (0, -1));
    }

    #[test]
    fn missing_fields_keep_current_values() {
        let dir = tempdir().unwrap();
        let path = save_path(dir.path());
        std::fs::write(&path, r#"{"player": {"hp": 1}, "dungeon": {"current": [5, 5]}}"#).unwrap();

        let mut p = Player::new(400, 300);
        let mut inv = Inventory::starting();
        let mut d = Dungeon::new();
        load_game(&path, &mut p, &mut inv, &mut d).unwrap();

        assert_eq!(p.hp, 1);
        assert_eq!(p.max_hp, 3);
        assert_eq!(p.rect.center(), (400, 300));
        assert_eq!(inv, Inventory::starting());
        assert_eq!(d.current(), (0, 0));
    }

    #[test]
    fn loose_numbers_are_truncated_and_clamped() {
        let dir = tempdir().unwrap();
        let path = save_path(dir.path());
        std::fs::write(
            &path,
            r#"{"player": {"hp": 2.0, "max_hp": 3.7},
                "inventory": {"bombs": -4, "keys": 2.9, "arrows": 12},
                "dungeon": {"current": [0.0, 1.0]}}"#,
        )
        .unwrap();

        let mut p = Player::new(400, 300);
        let mut inv = Inventory::starting();
        let mut d = Dungeon::new();
        load_game(&path, &mut p, &mut inv, &mut d).unwrap();

        assert_eq!(p.hp, 2);
        assert_eq!(p.max_hp, 3);
        assert_eq!(inv, Inventory { bombs: 0, keys: 2, arrows: 12 });
        assert_eq!(d.current(), (0, 1));
    }

    #[test]
    fn non_numeric_count_is_malformed() {
        let dir = tempdir().unwrap();
        let path = save_path(dir.path());
        std::fs::write(&path, r#"{"inventory": {"keys": "many"}}"#).unwrap();

        let mut p = Player::new(400, 300);
        let mut inv = Inventory::starting();
        let mut d = Dungeon::new();
        let err = load_game(&path, &mut p, &mut inv, &mut d).unwrap_err();
        assert!(matches!(err, PersistError::Parse(_)));
        assert_eq!(inv, Inventory::starting());
    }

    #[test]
    fn malformed_save_mutates_nothing() {
        let dir = tempdir().unwrap();
        let path = save_path(dir.path());
        std::fs::write(&path, "{\"player\": {\"hp\": 1").unwrap();

        let mut p = Player::new(400, 300);
        let mut inv = Inventory::starting();
        let mut d = Dungeon::new();
        let err = load_game(&path, &mut p, &mut inv, &mut d).unwrap_err();
        assert!(matches!(err, PersistError::Parse(_)));
        assert_eq!(p.hp, 3);
        assert_eq!(inv, Inventory::starting());
    }

    #[test]
    fn missing_save_is_io_error() {
        let dir = tempdir().unwrap();
        let mut p = Player::new(400, 300);
        let mut inv = Inventory::starting();
        let mut d = Dungeon::new();
        let err = load_game(&save_path(dir.path()), &mut p, &mut inv, &mut d).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
        assert!(!has_save(dir.path()));
    }

    #[test]
    fn options_round_trip() {
        let dir = tempdir().unwrap();
        let path = options_path(dir.path());
        let opts = Options { sound_enabled: false, volume: 0.3, difficulty: Difficulty::Hard };
        save_options(&path, &opts).unwrap();
        assert_eq!(load_options(&path).unwrap(), opts);
    }

    #[test]
    fn options_clamp_volume_and_default_difficulty() {
        let dir = tempdir().unwrap();
        let path = options_path(dir.path());
        std::fs::write(
            &path,
            r#"{"options": {"sound_enabled": true, "volume": 1.5, "difficulty": "Nightmare"}}"#,
        )
        .unwrap();
        let opts = load_options(&path).unwrap();
        assert_eq!(opts.volume, 1.0);
        assert_eq!(opts.difficulty, Difficulty::Normal);
    }

    #[test]
    fn malformed_options_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = options_path(dir.path());
        std::fs::write(&path, "not json").unwrap();
        assert!(load_options(&path).is_err());
        assert_eq!(load_options(&path).unwrap_or_default(), Options::default());
    }

    #[test]
    fn volume_cycle_wraps_past_full() {
        let mut opts = Options { volume: 0.9, ..Options::default() };
        opts.cycle_volume();
        assert_eq!(opts.volume, 1.0);
        opts.cycle_volume();
        assert_eq!(opts.volume, 0.0);
        opts.nudge_volume(-VOLUME_STEP);
        assert_eq!(opts.volume, 0.0);
        opts.cycle_volume();
        assert_eq!(opts.volume, 0.1);
    }

    #[test]
    fn muted_output_volume_is_zero() {
        let mut opts = Options::default();
        opts.nudge_volume(0.5);
        assert_eq!(opts.volume, 1.0);
        opts.sound_enabled = false;
        assert_eq!(opts.output_volume(), 0.0);
    }
}
