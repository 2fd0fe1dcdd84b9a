/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or the
/// XDG data dir). Falls back to sensible defaults if the file is missing
/// or incomplete. The loaded config is immutable and passed by reference;
/// difficulty presets are a fixed table combined with it on demand.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::enemy::EnemyKind;
use crate::domain::entity::PickupKind;
use crate::domain::room::ObstacleParams;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub balance: BalanceConfig,
    pub enemies: EnemyTable,
    pub gamepad: GamepadConfig,
    /// Where saves, options and the log live.
    pub data_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
}

impl TimingConfig {
    /// Fixed simulation step in seconds.
    pub fn dt(&self) -> f32 {
        self.tick_rate_ms as f32 / 1000.0
    }
}

#[derive(Clone, Debug)]
pub struct BalanceConfig {
    pub loot_chance: f32,
    pub loot_weights: Vec<(PickupKind, f32)>,
    pub obstacle_density: f32,
    pub corridor_width_tiles: i32,
    pub obstacle_max_per_room: usize,
    pub chest_chance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    pub hp: u32,
    pub speed_scale: f32,
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub struct EnemyTable {
    pub grunt: EnemyStats,
    pub runner: EnemyStats,
    pub brute: EnemyStats,
}

impl EnemyTable {
    pub fn get(&self, kind: EnemyKind) -> EnemyStats {
        match kind {
            EnemyKind::Grunt => self.grunt,
            EnemyKind::Runner => self.runner,
            EnemyKind::Brute => self.brute,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub melee: Vec<String>,
    pub shoot: Vec<String>,
    pub shield: Vec<String>,
    pub bomb: Vec<String>,
    pub interact: Vec<String>,
    pub pause: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── Difficulty ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Multipliers a difficulty applies on top of the base balance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyPreset {
    pub enemy_hp_scale: f32,
    pub enemy_speed_scale: f32,
    pub loot_scale: f32,
    pub obstacle_density_scale: f32,
    pub obstacle_max_scale: f32,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Difficulty> {
        Difficulty::ALL.into_iter().find(|d| d.name() == s)
    }

    /// Cycle forward (`step > 0`) or backward through the presets.
    pub fn cycle(self, step: i32) -> Difficulty {
        let n = Difficulty::ALL.len() as i32;
        let idx = Difficulty::ALL.iter().position(|d| *d == self).unwrap_or(0) as i32;
        Difficulty::ALL[(idx + step.signum()).rem_euclid(n) as usize]
    }

    pub fn preset(self) -> DifficultyPreset {
        match self {
            Difficulty::Easy => DifficultyPreset {
                enemy_hp_scale: 0.8,
                enemy_speed_scale: 0.9,
                loot_scale: 1.2,
                obstacle_density_scale: 0.8,
                obstacle_max_scale: 0.8,
            },
            Difficulty::Normal => DifficultyPreset {
                enemy_hp_scale: 1.0,
                enemy_speed_scale: 1.0,
                loot_scale: 1.0,
                obstacle_density_scale: 1.0,
                obstacle_max_scale: 1.0,
            },
            Difficulty::Hard => DifficultyPreset {
                enemy_hp_scale: 1.3,
                enemy_speed_scale: 1.15,
                loot_scale: 0.8,
                obstacle_density_scale: 1.1,
                obstacle_max_scale: 1.15,
            },
        }
    }
}

/// Balance actually in effect: base config scaled by a difficulty.
#[derive(Clone, Debug)]
pub struct ActiveBalance {
    pub difficulty: Difficulty,
    pub loot_chance: f32,
    pub loot_weights: Vec<(PickupKind, f32)>,
    pub chest_chance: f32,
    pub obstacles: ObstacleParams,
    /// Spawn weight per kind (normalised at draw time).
    pub spawn_weights: Vec<(EnemyKind, f32)>,
    enemies: EnemyTable,
    preset: DifficultyPreset,
}

impl ActiveBalance {
    /// Hit points and speed scale for a freshly spawned enemy.
    pub fn enemy_stats(&self, kind: EnemyKind) -> (u32, f32) {
        let base = self.enemies.get(kind);
        let hp = (base.hp as f32 * self.preset.enemy_hp_scale).round().max(1.0) as u32;
        (hp, base.speed_scale * self.preset.enemy_speed_scale)
    }
}

impl GameConfig {
    pub fn balance_for(&self, difficulty: Difficulty) -> ActiveBalance {
        let preset = difficulty.preset();
        let b = &self.balance;
        ActiveBalance {
            difficulty,
            loot_chance: (b.loot_chance * preset.loot_scale).clamp(0.0, 1.0),
            loot_weights: b.loot_weights.clone(),
            chest_chance: b.chest_chance.clamp(0.0, 1.0),
            obstacles: ObstacleParams {
                density: (b.obstacle_density * preset.obstacle_density_scale).clamp(0.0, 1.0),
                max_count: (b.obstacle_max_per_room as f32 * preset.obstacle_max_scale).round().max(0.0) as usize,
                corridor_tiles: b.corridor_width_tiles,
            },
            spawn_weights: EnemyKind::ALL.iter().map(|k| (*k, self.enemies.get(*k).weight)).collect(),
            enemies: self.enemies.clone(),
            preset,
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    balance: TomlBalance,
    #[serde(default)]
    enemies: TomlEnemies,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlBalance {
    #[serde(default = "default_loot_chance")]
    loot_chance: f32,
    #[serde(default = "default_obstacle_density")]
    obstacle_density: f32,
    #[serde(default = "default_corridor_width")]
    corridor_width_tiles: i32,
    #[serde(default = "default_obstacle_max")]
    obstacle_max_per_room: usize,
    #[serde(default = "default_chest_chance")]
    chest_chance: f32,
    #[serde(default)]
    loot_weights: TomlLootWeights,
}

#[derive(Deserialize, Debug)]
struct TomlLootWeights {
    #[serde(default = "default_w_arrow")]
    arrow: f32,
    #[serde(default = "default_w_magic")]
    magic: f32,
    #[serde(default = "default_w_key")]
    key: f32,
    #[serde(default)]
    bomb: f32,
}

#[derive(Deserialize, Debug, Clone, Copy)]
struct TomlEnemy {
    hp: Option<u32>,
    speed_scale: Option<f32>,
    weight: Option<f32>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlEnemies {
    grunt: Option<TomlEnemy>,
    runner: Option<TomlEnemy>,
    brute: Option<TomlEnemy>,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_melee")]
    melee: Vec<String>,
    #[serde(default = "default_shoot")]
    shoot: Vec<String>,
    #[serde(default = "default_shield")]
    shield: Vec<String>,
    #[serde(default = "default_bomb")]
    bomb: Vec<String>,
    #[serde(default = "default_interact")]
    interact: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    data_dir: Option<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_loot_chance() -> f32 { 0.35 }
fn default_obstacle_density() -> f32 { 0.12 }
fn default_corridor_width() -> i32 { 2 }
fn default_obstacle_max() -> usize { 14 }
fn default_chest_chance() -> f32 { 0.85 }
fn default_w_arrow() -> f32 { 0.5 }
fn default_w_magic() -> f32 { 0.35 }
fn default_w_key() -> f32 { 0.15 }

const GRUNT: EnemyStats = EnemyStats { hp: 2, speed_scale: 1.0, weight: 0.6 };
const RUNNER: EnemyStats = EnemyStats { hp: 1, speed_scale: 1.4, weight: 0.25 };
const BRUTE: EnemyStats = EnemyStats { hp: 3, speed_scale: 0.75, weight: 0.15 };

fn default_melee() -> Vec<String> { vec!["X".into()] }
fn default_shoot() -> Vec<String> { vec!["Y".into()] }
fn default_shield() -> Vec<String> { vec!["R1".into(), "R2".into()] }
fn default_bomb() -> Vec<String> { vec!["L1".into()] }
fn default_interact() -> Vec<String> { vec!["A".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into(), "Select".into()] }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlBalance {
    fn default() -> Self {
        TomlBalance {
            loot_chance: default_loot_chance(),
            obstacle_density: default_obstacle_density(),
            corridor_width_tiles: default_corridor_width(),
            obstacle_max_per_room: default_obstacle_max(),
            chest_chance: default_chest_chance(),
            loot_weights: TomlLootWeights::default(),
        }
    }
}

impl Default for TomlLootWeights {
    fn default() -> Self {
        TomlLootWeights { arrow: default_w_arrow(), magic: default_w_magic(), key: default_w_key(), bomb: 0.0 }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            melee: default_melee(),
            shoot: default_shoot(),
            shield: default_shield(),
            bomb: default_bomb(),
            interact: default_interact(),
            pause: default_pause(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

fn merge_enemy(base: EnemyStats, over: Option<TomlEnemy>) -> EnemyStats {
    match over {
        None => base,
        Some(o) => EnemyStats {
            hp: o.hp.unwrap_or(base.hp).max(1),
            speed_scale: o.speed_scale.unwrap_or(base.speed_scale),
            weight: o.weight.unwrap_or(base.weight),
        },
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/isac`. Missing file or keys fall back to defaults.
    pub fn load() -> Self {
        let toml_cfg = load_toml(&candidate_dirs());
        GameConfig::from_toml(toml_cfg, &default_data_dir())
    }

    /// Parse a config document. Unknown keys are ignored.
    pub fn parse(text: &str, fallback_data_dir: &Path) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(cfg, fallback_data_dir))
    }

    fn from_toml(t: TomlConfig, fallback_data_dir: &Path) -> Self {
        let w = &t.balance.loot_weights;
        GameConfig {
            timing: TimingConfig { tick_rate_ms: t.timing.tick_rate_ms.max(1) },
            balance: BalanceConfig {
                loot_chance: t.balance.loot_chance,
                loot_weights: vec![
                    (PickupKind::Arrow, w.arrow),
                    (PickupKind::Magic, w.magic),
                    (PickupKind::Key, w.key),
                    (PickupKind::Bomb, w.bomb),
                ],
                obstacle_density: t.balance.obstacle_density,
                corridor_width_tiles: t.balance.corridor_width_tiles,
                obstacle_max_per_room: t.balance.obstacle_max_per_room,
                chest_chance: t.balance.chest_chance,
            },
            enemies: EnemyTable {
                grunt: merge_enemy(GRUNT, t.enemies.grunt),
                runner: merge_enemy(RUNNER, t.enemies.runner),
                brute: merge_enemy(BRUTE, t.enemies.brute),
            },
            gamepad: GamepadConfig {
                melee: t.gamepad.melee,
                shoot: t.gamepad.shoot,
                shield: t.gamepad.shield,
                bomb: t.gamepad.bomb,
                interact: t.gamepad.interact,
                pause: t.gamepad.pause,
                confirm: t.gamepad.confirm,
                cancel: t.gamepad.cancel,
            },
            data_dir: t
                .general
                .data_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| fallback_data_dir.to_path_buf()),
        }
    }
}

/// Writable data directory: exe dir if writable, else
/// `~/.local/share/isac`, else CWD.
pub fn default_data_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let marker = parent.join(".write_test_isac");
            if std::fs::write(&marker, "").is_ok() {
                let _ = std::fs::remove_file(&marker);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/isac");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Candidate directories to search: exe dir + CWD + XDG data (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/isac");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "config parse error, using defaults");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read config");
            }
        }
    }
    tracing::info!("no config.toml found, using defaults");
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> GameConfig {
        GameConfig::parse(text, Path::new("/tmp/isac-test")).unwrap()
    }

    #[test]
    fn empty_document_gives_defaults() {
        let c = parse("");
        assert_eq!(c.timing.tick_rate_ms, 16);
        assert_eq!(c.balance.loot_chance, 0.35);
        assert_eq!(c.enemies.runner, RUNNER);
        assert_eq!(c.data_dir, PathBuf::from("/tmp/isac-test"));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let c = parse(
            r#"
            [balance]
            loot_chance = 1.0
            [enemies.brute]
            hp = 9
            [general]
            data_dir = "/srv/isac"
            "#,
        );
        assert_eq!(c.balance.loot_chance, 1.0);
        assert_eq!(c.balance.obstacle_max_per_room, 14);
        assert_eq!(c.enemies.brute.hp, 9);
        assert_eq!(c.enemies.brute.weight, BRUTE.weight);
        assert_eq!(c.data_dir, PathBuf::from("/srv/isac"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[balance\nloot_chance = ", Path::new(".")).is_err());
    }

    #[test]
    fn difficulty_parsing_and_cycling() {
        assert_eq!(Difficulty::parse("Hard"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse("Nightmare"), None);
        assert_eq!(Difficulty::Hard.cycle(1), Difficulty::Easy);
        assert_eq!(Difficulty::Easy.cycle(-1), Difficulty::Hard);
        assert_eq!(Difficulty::default(), Difficulty::Normal);
    }

    #[test]
    fn balance_scales_with_difficulty() {
        let c = parse("");
        let normal = c.balance_for(Difficulty::Normal);
        assert_eq!(normal.obstacles, ObstacleParams::default());
        assert_eq!(normal.enemy_stats(EnemyKind::Grunt), (2, 1.0));

        let hard = c.balance_for(Difficulty::Hard);
        assert_eq!(hard.obstacles.max_count, 16);
        assert_eq!(hard.enemy_stats(EnemyKind::Brute).0, 4);
        assert!((hard.loot_chance - 0.28).abs() < 1e-6);

        let easy = c.balance_for(Difficulty::Easy);
        assert_eq!(easy.enemy_stats(EnemyKind::Runner).0, 1);
    }

    #[test]
    fn loot_chance_is_clamped() {
        let c = parse("[balance]\nloot_chance = 0.9\n");
        assert_eq!(c.balance_for(Difficulty::Easy).loot_chance, 1.0);
    }
}
