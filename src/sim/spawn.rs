/// Room entry and one-time population.
///
/// A room is populated the first time it is entered while neither
/// `spawned` nor `cleared` is set: maybe a chest near the centre, then
/// exactly two enemies at fixed grid offsets nudged onto free tiles.
/// Re-entering never repopulates.

use rand::Rng;

use crate::config::ActiveBalance;
use crate::domain::enemy::{Enemy, EnemyKind, ENEMY_SIZE};
use crate::domain::entity::Chest;
use crate::domain::geom::{Rect, SCREEN_H, SCREEN_W};
use crate::domain::loot::weighted_pick;
use crate::domain::room::{RoomGeometry, TILE};
use crate::sim::world::PlayState;

/// Ring search gives up beyond this many tiles.
const SEARCH_RINGS: i32 = 7;
const CHEST_JITTER_X: i32 = 120;
const CHEST_JITTER_Y: i32 = 100;

/// Can an enemy-sized body stand centred at (x, y)?
pub fn place_free(geo: &RoomGeometry, x: i32, y: i32) -> bool {
    !geo.blocked(&Rect::centered(x, y, ENEMY_SIZE, ENEMY_SIZE))
}

/// Closest free spot to (x, y), scanning square rings of growing radius
/// one tile apart. Falls back to the screen centre.
pub fn nearest_free(geo: &RoomGeometry, x: i32, y: i32) -> (i32, i32) {
    if place_free(geo, x, y) {
        return (x, y);
    }
    for ring in 1..=SEARCH_RINGS {
        let r = ring * TILE;
        for dx in (-r..=r).step_by(TILE as usize) {
            for dy in (-r..=r).step_by(TILE as usize) {
                if dx.abs() != r && dy.abs() != r {
                    continue;
                }
                if place_free(geo, x + dx, y + dy) {
                    return (x + dx, y + dy);
                }
            }
        }
    }
    (SCREEN_W / 2, SCREEN_H / 2)
}

/// Draw a kind from the spawn weights and scale it by the balance.
pub fn spawn_enemy<R: Rng>(balance: &ActiveBalance, rng: &mut R, x: i32, y: i32) -> Enemy {
    let kind = weighted_pick(&balance.spawn_weights, rng).unwrap_or(EnemyKind::Grunt);
    let (hp, speed_scale) = balance.enemy_stats(kind);
    Enemy::new(kind, x, y, hp, speed_scale)
}

/// Refresh geometry for the current room, populate it if due, and set
/// its doors: closed while enemies live, otherwise open (locked doors
/// are never touched).
pub fn enter_room(play: &mut PlayState) {
    let pos = play.dungeon.current();
    play.geometry = RoomGeometry::for_room(pos, &play.balance.obstacles);

    let room = play.dungeon.current_room();
    if !room.spawned && !room.cleared {
        populate(play);
    }

    if play.dungeon.current_room().has_live_enemies() {
        play.dungeon.set_current_doors_open(false, true);
    } else {
        play.dungeon.open_all_unlocked_in_current();
    }

    if let Some(companion) = play.companion.as_mut() {
        companion.snap_to(&play.player.rect);
    }
    play.spikes.clear();
}

fn populate(play: &mut PlayState) {
    let geo = &play.geometry;
    let rng = &mut play.rng;

    let mut chest = None;
    if rng.gen::<f32>() < play.balance.chest_chance {
        let cx = SCREEN_W / 2 + rng.gen_range(-CHEST_JITTER_X..=CHEST_JITTER_X);
        let cy = SCREEN_H / 2 + rng.gen_range(-CHEST_JITTER_Y..=CHEST_JITTER_Y);
        if place_free(geo, cx, cy) {
            chest = Some(Chest::new(cx, cy));
        }
    }

    let spots = [
        nearest_free(geo, SCREEN_W / 3, SCREEN_H / 3),
        nearest_free(geo, SCREEN_W * 2 / 3, SCREEN_H * 2 / 3),
    ];
    let enemies: Vec<Enemy> = spots
        .iter()
        .map(|&(x, y)| spawn_enemy(&play.balance, &mut *rng, x, y))
        .collect();

    let room = play.dungeon.current_room_mut();
    room.chests.extend(chest);
    room.enemies = enemies;
    room.spawned = true;
    tracing::info!(
        room = ?room.pos,
        enemies = room.enemies.len(),
        chest = !room.chests.is_empty(),
        "room populated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Difficulty, GameConfig};
    use crate::domain::room::Direction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::Path;

    fn config(extra: &str) -> GameConfig {
        GameConfig::parse(extra, Path::new(".")).unwrap()
    }

    #[test]
    fn free_spot_is_returned_as_is() {
        let geo = RoomGeometry::default();
        assert_eq!(nearest_free(&geo, 200, 200), (200, 200));
    }

    #[test]
    fn blocked_spot_moves_to_first_ring() {
        let geo = RoomGeometry { walls: vec![], obstacles: vec![Rect::new(190, 190, 20, 20)] };
        let (x, y) = nearest_free(&geo, 200, 200);
        assert_ne!((x, y), (200, 200));
        assert_eq!((x - 200).abs().max((y - 200).abs()), TILE);
        assert!(place_free(&geo, x, y));
    }

    #[test]
    fn fully_blocked_falls_back_to_centre() {
        let geo = RoomGeometry { walls: vec![Rect::new(-1000, -1000, 3000, 3000)], obstacles: vec![] };
        assert_eq!(nearest_free(&geo, 100, 100), (SCREEN_W / 2, SCREEN_H / 2));
    }

    #[test]
    fn spawn_uses_weights_and_scaled_stats() {
        let cfg = config("[enemies.grunt]\nweight = 0.0\n[enemies.runner]\nweight = 0.0\n");
        let balance = cfg.balance_for(Difficulty::Hard);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let e = spawn_enemy(&balance, &mut rng, 300, 300);
            assert_eq!(e.kind(), EnemyKind::Brute);
            assert_eq!(e.max_hp, 4.0);
        }
    }

    #[test]
    fn room_populates_exactly_once() {
        let cfg = config("");
        let mut play = crate::sim::world::PlayState::new(&cfg, Difficulty::Normal, 11);
        let first: Vec<Rect> = play.dungeon.current_room().enemies.iter().map(|e| e.rect).collect();
        assert_eq!(first.len(), 2);

        play.dungeon.current_room_mut().enemies.pop();
        enter_room(&mut play);
        enter_room(&mut play);
        let room = play.dungeon.current_room();
        assert!(room.spawned);
        assert_eq!(room.enemies.len(), 1);
        assert_eq!(room.enemies[0].rect, first[0]);
    }

    #[test]
    fn certain_chest_is_placed_near_centre() {
        let cfg = config("[balance]\nchest_chance = 1.0\nobstacle_density = 0.0\n");
        let play = crate::sim::world::PlayState::new(&cfg, Difficulty::Normal, 5);
        let chests = &play.dungeon.current_room().chests;
        assert_eq!(chests.len(), 1);
        let c = chests[0].rect;
        assert!((c.x - SCREEN_W / 2).abs() <= CHEST_JITTER_X);
        assert!((c.y - SCREEN_H / 2).abs() <= CHEST_JITTER_Y);
    }

    #[test]
    fn cleared_room_opens_unlocked_doors_on_entry() {
        let cfg = config("");
        let mut play = crate::sim::world::PlayState::new(&cfg, Difficulty::Normal, 2);
        play.dungeon.current_room_mut().enemies.clear();
        play.dungeon.current_room_mut().cleared = true;
        enter_room(&mut play);
        let room = play.dungeon.current_room();
        assert!(room.door(Direction::Up).open);
        assert!(room.door(Direction::Right).locked);
        assert!(!room.door(Direction::Right).open);
    }
}
