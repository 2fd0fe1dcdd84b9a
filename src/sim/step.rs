/// The step function: advances a run by one fixed tick.
///
/// Processing order:
///   1. Edge actions (melee, arrow, bomb, interact)
///   2. Player movement, shield, room-geometry collision (revert)
///   3. Auto pickup, chest auto-open
///   4. Arrows: walls → obstacles → enemies → bounds
///   5. Door triggers (may start a room fade)
///   6. Enemies move; active melee swing hits
///   7. Dead enemies dropped from the room's own list
///   8. Contact damage (gated by invulnerability and shield)
///   9. Death starts the game-over fade (once)
///  10. Room clear opens unlocked doors (once)
///  11. Timers, transition fades, companion and its spikes
///
/// Enemies and chests are read and written in place on the current
/// `Room`; there is no second copy to keep in sync.

use crate::domain::entity::{
    Arrow, ChestItem, Companion, KillFlash, MoveIntent, ARROW_DAMAGE, KILL_FLASH_TIME, PLAYER_SIZE,
};
use crate::domain::geom::{Rect, SCREEN_H, SCREEN_W};
use crate::domain::loot::roll_loot;
use crate::domain::entity::Pickup;
use crate::domain::room::{door_rect, Direction, ROOM_PADDING, WALL_THICKNESS};
use super::event::GameEvent;
use super::spawn;
use super::world::{FadeTarget, PlayState, Transition, DOOR_COOLDOWN, GAME_OVER_FADE, ROOM_FADE_IN, ROOM_FADE_OUT};

pub const MELEE_DAMAGE: f32 = 1.0;
pub const BOMB_DAMAGE: f32 = 3.0;
/// Bomb blast reaches this far around the player on each side.
pub const BOMB_REACH: i32 = 80;
pub const CONTACT_DAMAGE: i32 = 1;
pub const DOOR_FEEDBACK_TIME: f32 = 1.0;

const KILL_SHAKE: (f32, i32) = (0.15, 4);
const HURT_SHAKE: (f32, i32) = (0.25, 6);

/// Player flush against the wall opposite the door used.
const ENTRY_OFFSET: i32 = ROOM_PADDING + WALL_THICKNESS + PLAYER_SIZE / 2 + 1;

/// One tick of player input. Movement and shield are held; the rest
/// are edge-triggered presses.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: MoveIntent,
    pub shield: bool,
    pub melee: bool,
    pub shoot: bool,
    pub bomb: bool,
    pub interact: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(play: &mut PlayState, input: FrameInput, dt: f32) -> Vec<GameEvent> {
    if play.transition == Transition::Finished {
        return vec![];
    }
    let mut events: Vec<GameEvent> = Vec::new();

    resolve_actions(play, input, &mut events);
    resolve_player(play, input, dt);
    try_pickup(play, &mut events);
    try_open_chest(play, &mut events);
    resolve_arrows(play, dt, &mut events);
    resolve_door_triggers(play);
    resolve_enemies(play, dt, &mut events);
    play.dungeon.current_room_mut().enemies.retain(|e| e.alive);
    resolve_contact_damage(play, &mut events);
    if play.player.hp <= 0 {
        begin_game_over(play);
    }
    resolve_room_clear(play, &mut events);
    resolve_timers(play, dt);
    resolve_transition(play, dt, &mut events);
    resolve_companion(play, dt, &mut events);

    events
}

/// Start the game-over fade. Supersedes a room fade; a no-op once the
/// game-over fade is already running or done.
pub fn begin_game_over(play: &mut PlayState) {
    if play.is_game_over() {
        return;
    }
    tracing::info!(room = ?play.dungeon.current(), "player died");
    play.transition = Transition::FadingOut { target: FadeTarget::GameOver, elapsed: 0.0 };
}

// ══════════════════════════════════════════════════════════════
// Kills
// ══════════════════════════════════════════════════════════════

/// Loot draw at the enemy's centre plus a kill flash (always).
fn on_enemy_killed(play: &mut PlayState, rect: Rect, events: &mut Vec<GameEvent>) {
    let (x, y) = rect.center();
    if let Some(kind) = roll_loot(play.balance.loot_chance, &play.balance.loot_weights, &mut play.rng) {
        play.pickups.push(Pickup::new(kind, x, y));
        events.push(GameEvent::LootDropped { kind, x, y });
    }
    play.kill_flashes.push(KillFlash { rect, remaining: KILL_FLASH_TIME });
}

fn kill_with_shake(play: &mut PlayState, rect: Rect, events: &mut Vec<GameEvent>) {
    let (x, y) = rect.center();
    events.push(GameEvent::EnemyKilled { x, y });
    play.shake.kick(KILL_SHAKE.0, KILL_SHAKE.1);
    on_enemy_killed(play, rect, events);
}

// ══════════════════════════════════════════════════════════════
// Actions
// ══════════════════════════════════════════════════════════════

fn resolve_actions(play: &mut PlayState, input: FrameInput, events: &mut Vec<GameEvent>) {
    if play.is_game_over() {
        return;
    }
    if input.melee {
        play.player.start_melee();
    }
    if input.shoot && play.inventory.use_arrow() {
        let (cx, cy) = play.player.rect.center();
        play.arrows.push(Arrow::new(cx, cy, play.player.facing));
        events.push(GameEvent::ArrowShot);
    }
    if input.bomb && play.inventory.use_bomb() {
        detonate_bomb(play, events);
    }
    if input.interact {
        try_pickup(play, events);
        try_unlock_door(play, events);
        try_open_chest(play, events);
    }
}

fn detonate_bomb(play: &mut PlayState, events: &mut Vec<GameEvent>) {
    events.push(GameEvent::BombExploded);
    let blast = play.player.rect.inflate(BOMB_REACH * 2, BOMB_REACH * 2);
    let mut killed = vec![];
    for e in play.dungeon.current_room_mut().enemies.iter_mut() {
        if e.alive && blast.overlaps(&e.rect) && e.take_damage(BOMB_DAMAGE) {
            killed.push(e.rect);
        }
    }
    for rect in killed {
        kill_with_shake(play, rect, events);
    }
}

fn try_pickup(play: &mut PlayState, events: &mut Vec<GameEvent>) {
    let player_rect = play.player.rect;
    let mut i = 0;
    while i < play.pickups.len() {
        if play.pickups[i].rect().overlaps(&player_rect) {
            let p = play.pickups.remove(i);
            p.apply(&mut play.player, &mut play.inventory);
            events.push(GameEvent::PickedUp { kind: p.kind });
        } else {
            i += 1;
        }
    }
}

/// A locked door whose trigger the player touches opens for one key.
fn try_unlock_door(play: &mut PlayState, events: &mut Vec<GameEvent>) {
    for dir in Direction::ALL {
        let door = play.dungeon.current_room().door(dir);
        if door.locked && door_rect(dir).overlaps(&play.player.rect) {
            if play.inventory.use_key() {
                play.dungeon.unlock(dir);
                tracing::info!(room = ?play.dungeon.current(), ?dir, "door unlocked");
                events.push(GameEvent::DoorUnlocked { dir });
            }
            return;
        }
    }
}

/// Open the first unopened chest in reach and apply its item.
fn try_open_chest(play: &mut PlayState, events: &mut Vec<GameEvent>) {
    let player_rect = play.player.rect;
    let mut found = None;
    for chest in play.dungeon.current_room_mut().chests.iter_mut() {
        if !chest.opened && chest.in_reach(&player_rect) {
            found = chest.open(&mut play.rng);
            break;
        }
    }
    if let Some(item) = found {
        apply_chest_item(play, item);
        events.push(GameEvent::ChestOpened { item });
    }
}

fn apply_chest_item(play: &mut PlayState, item: ChestItem) {
    match item {
        ChestItem::SpeedBoots => {
            let mult = if play.has_speed_boots { play.player.speed_multiplier * 1.2 } else { 1.5 };
            play.player.apply_speed_boots(mult);
            play.has_speed_boots = true;
        }
        ChestItem::Companion => {
            if !play.companion.as_ref().is_some_and(|c| c.active()) {
                play.companion = Some(Companion::beside(&play.player.rect));
            }
        }
        ChestItem::HealthDoubler => {
            if !play.health_doubled {
                play.player.double_health();
                play.health_doubled = true;
            }
        }
    }
    tracing::info!(item = item.name(), "chest opened");
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player(play: &mut PlayState, input: FrameInput, dt: f32) {
    play.door_cooldown = (play.door_cooldown - dt).max(0.0);

    // Movement is frozen while a fade is in flight.
    let intent = if play.transition.is_idle() { input.movement } else { MoveIntent::default() };
    play.player.update(dt, intent);
    play.player.hold_shield(input.shield, dt);

    if play.geometry.hits_wall(&play.player.rect) {
        play.player.revert_position();
    }
    if play.geometry.hits_obstacle(&play.player.rect) {
        play.player.revert_position();
    }
}

// ══════════════════════════════════════════════════════════════
// Arrows
// ══════════════════════════════════════════════════════════════

fn resolve_arrows(play: &mut PlayState, dt: f32, events: &mut Vec<GameEvent>) {
    let mut killed = vec![];
    for a in play.arrows.iter_mut() {
        a.update(dt);
        let r = a.rect();
        if play.geometry.hits_wall(&r) {
            a.alive = false;
            continue;
        }
        if play.geometry.hits_obstacle(&r) {
            a.alive = false;
            events.push(GameEvent::ArrowHit);
            continue;
        }
        for e in play.dungeon.current_room_mut().enemies.iter_mut() {
            if e.alive && r.overlaps(&e.rect) {
                if e.take_damage(ARROW_DAMAGE) {
                    killed.push(e.rect);
                } else {
                    events.push(GameEvent::ArrowHit);
                }
                a.alive = false;
                break;
            }
        }
        if a.alive && a.off_screen() {
            a.alive = false;
        }
    }
    play.arrows.retain(|a| a.alive);
    for rect in killed {
        kill_with_shake(play, rect, events);
    }
}

// ══════════════════════════════════════════════════════════════
// Doors / transitions
// ══════════════════════════════════════════════════════════════

fn resolve_door_triggers(play: &mut PlayState) {
    let touching: Option<Direction> = Direction::ALL
        .into_iter()
        .find(|&d| door_rect(d).overlaps(&play.player.rect));

    // After arriving, the player has to step off the entry door once.
    if play.door_rearm {
        if touching.is_none() {
            play.door_rearm = false;
        }
        return;
    }
    if play.door_cooldown > 0.0 || !play.transition.is_idle() {
        return;
    }
    let Some(dir) = touching else { return };
    let here = play.dungeon.current();
    if !play.dungeon.current_room().door(dir).open || play.dungeon.room(dir.step(here)).is_none() {
        return;
    }
    play.transition = Transition::FadingOut { target: FadeTarget::Room(dir), elapsed: 0.0 };
}

/// Fade bookkeeping. A finished room fade-out performs the switch; a
/// finished game-over fade reports `GameOver` once.
fn resolve_transition(play: &mut PlayState, dt: f32, events: &mut Vec<GameEvent>) {
    match play.transition {
        Transition::Idle | Transition::Finished => {}
        Transition::FadingOut { target, elapsed } => {
            let elapsed = elapsed + dt;
            let total = match target {
                FadeTarget::Room(_) => ROOM_FADE_OUT,
                FadeTarget::GameOver => GAME_OVER_FADE,
            };
            if elapsed < total {
                play.transition = Transition::FadingOut { target, elapsed };
                return;
            }
            match target {
                FadeTarget::Room(dir) => {
                    complete_room_move(play, dir, events);
                    play.transition = Transition::FadingIn { elapsed: 0.0 };
                }
                FadeTarget::GameOver => {
                    play.transition = Transition::Finished;
                    events.push(GameEvent::GameOver);
                }
            }
        }
        Transition::FadingIn { elapsed } => {
            let elapsed = elapsed + dt;
            play.transition = if elapsed >= ROOM_FADE_IN {
                Transition::Idle
            } else {
                Transition::FadingIn { elapsed }
            };
        }
    }
}

fn complete_room_move(play: &mut PlayState, dir: Direction, events: &mut Vec<GameEvent>) {
    if !play.dungeon.move_through(dir) {
        return;
    }
    let (cx, cy) = play.player.rect.center();
    let (x, y) = match dir {
        Direction::Up => (cx, SCREEN_H - ENTRY_OFFSET),
        Direction::Down => (cx, ENTRY_OFFSET),
        Direction::Left => (SCREEN_W - ENTRY_OFFSET, cy),
        Direction::Right => (ENTRY_OFFSET, cy),
    };
    play.player.place_at(x, y);
    play.arrows.clear();
    play.pickups.clear();
    play.kill_flashes.clear();

    spawn::enter_room(play);
    play.door_cooldown = DOOR_COOLDOWN;
    play.door_rearm = true;

    let pos = play.dungeon.current();
    tracing::info!(room = ?pos, "entered room");
    events.push(GameEvent::RoomEntered { pos });
}

/// Re-enter the room a save was loaded into. Anything in flight is
/// dropped; loose pickups only survive if the room did not change.
pub fn resume_after_load(play: &mut PlayState, previous: (i32, i32)) {
    play.arrows.clear();
    play.kill_flashes.clear();
    if play.dungeon.current() != previous {
        play.pickups.clear();
    }
    play.transition = Transition::Idle;
    play.shake = Default::default();
    spawn::enter_room(play);
    play.door_cooldown = DOOR_COOLDOWN;
    play.door_rearm = true;
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(play: &mut PlayState, dt: f32, events: &mut Vec<GameEvent>) {
    let target = play.player.rect.center();
    let hitbox = play.player.melee_hitbox();
    let mut killed = vec![];

    for e in play.dungeon.current_room_mut().enemies.iter_mut() {
        if e.update(target, dt, &play.geometry) {
            events.push(GameEvent::ChargeStarted);
        }
    }
    if let Some(hit) = hitbox {
        for e in play.dungeon.current_room_mut().enemies.iter_mut() {
            if e.alive && hit.overlaps(&e.rect) && e.take_damage(MELEE_DAMAGE) {
                killed.push(e.rect);
            }
        }
    }
    for rect in killed {
        kill_with_shake(play, rect, events);
    }
}

fn resolve_contact_damage(play: &mut PlayState, events: &mut Vec<GameEvent>) {
    if play.player.invuln > 0.0 || play.player.shield {
        return;
    }
    let player_rect = play.player.rect;
    let touching = play
        .dungeon
        .current_room()
        .enemies
        .iter()
        .any(|e| e.alive && e.rect.overlaps(&player_rect));
    if touching && play.player.take_damage(CONTACT_DAMAGE) {
        events.push(GameEvent::PlayerHurt { hp: play.player.hp });
        play.shake.kick(HURT_SHAKE.0, HURT_SHAKE.1);
    }
}

fn resolve_room_clear(play: &mut PlayState, events: &mut Vec<GameEvent>) {
    let room = play.dungeon.current_room_mut();
    if room.cleared || !room.spawned || !room.enemies.is_empty() {
        return;
    }
    room.cleared = true;
    let pos = room.pos;
    play.dungeon.open_all_unlocked_in_current();
    play.door_feedback = DOOR_FEEDBACK_TIME;
    tracing::info!(room = ?pos, "room cleared");
    events.push(GameEvent::RoomCleared { pos });
    events.push(GameEvent::DoorOpened);
}

// ══════════════════════════════════════════════════════════════
// Timers / companion
// ══════════════════════════════════════════════════════════════

fn resolve_timers(play: &mut PlayState, dt: f32) {
    play.door_feedback = (play.door_feedback - dt).max(0.0);
    play.shake.decay(dt);
    for f in play.kill_flashes.iter_mut() {
        f.remaining = (f.remaining - dt).max(0.0);
    }
    play.kill_flashes.retain(|f| f.remaining > 0.0);
    for chest in play.dungeon.current_room_mut().chests.iter_mut() {
        chest.update(dt);
    }
}

fn resolve_companion(play: &mut PlayState, dt: f32, events: &mut Vec<GameEvent>) {
    let mut expired = false;
    if let Some(c) = play.companion.as_mut() {
        c.update(dt, &play.player.rect);
        if c.active() {
            let target = c.nearest_target(&play.dungeon.current_room().enemies).map(|e| e.rect);
            if let Some(target) = target {
                play.spikes.extend(c.shoot_at(&target));
            }
        } else {
            expired = true;
        }
    }
    if expired {
        play.companion = None;
    }

    let mut killed = vec![];
    for s in play.spikes.iter_mut() {
        s.update(dt);
        if !s.alive {
            continue;
        }
        let r = s.rect();
        for e in play.dungeon.current_room_mut().enemies.iter_mut() {
            if e.alive && r.overlaps(&e.rect) {
                if e.take_damage(s.damage) {
                    killed.push(e.rect);
                }
                s.alive = false;
                break;
            }
        }
    }
    play.spikes.retain(|s| s.alive);
    for rect in killed {
        let (x, y) = rect.center();
        events.push(GameEvent::EnemyKilled { x, y });
        on_enemy_killed(play, rect, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Difficulty, GameConfig};
    use crate::domain::enemy::{Enemy, EnemyKind};
    use crate::domain::entity::PickupKind;
    use std::path::Path;

    const DT: f32 = 1.0 / 60.0;

    /// A run whose start room holds exactly `enemies` and no obstacles.
    fn play_with(enemies: Vec<Enemy>) -> PlayState {
        let cfg = GameConfig::parse("", Path::new(".")).unwrap();
        let mut play = PlayState::new(&cfg, Difficulty::Normal, 9);
        play.geometry.obstacles.clear();
        play.pickups.clear();
        let room = play.dungeon.current_room_mut();
        room.enemies = enemies;
        room.chests.clear();
        play
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    #[test]
    fn clearing_room_opens_unlocked_doors_once() {
        let mut play = play_with(vec![]);
        assert!(!play.dungeon.current_room().door(Direction::Up).open);

        let events = step(&mut play, idle(), DT);
        let room = play.dungeon.current_room();
        assert!(room.cleared);
        assert!(room.door(Direction::Up).open);
        assert!(room.door(Direction::Right).locked && !room.door(Direction::Right).open);
        assert!(events.contains(&GameEvent::DoorOpened));
        assert!(play.door_feedback > 0.0);

        let again = step(&mut play, idle(), DT);
        assert!(!again.contains(&GameEvent::DoorOpened));
    }

    #[test]
    fn arrow_kill_drops_loot_and_leaves_room_list() {
        let mut play = play_with(vec![Enemy::new(EnemyKind::Grunt, 400, 200, 1, 1.0)]);
        play.balance.loot_chance = 1.0;
        play.balance.loot_weights = vec![(PickupKind::Key, 0.15)];
        play.player.facing = Direction::Up;

        let mut input = FrameInput { shoot: true, ..idle() };
        let mut killed = false;
        for _ in 0..20 {
            let events = step(&mut play, input, DT);
            input = idle();
            if events.iter().any(|e| matches!(e, GameEvent::EnemyKilled { .. })) {
                killed = true;
                break;
            }
        }
        assert!(killed);
        assert!(play.dungeon.current_room().enemies.is_empty());
        assert_eq!(play.pickups.len(), 1);
        assert_eq!(play.pickups[0].kind, PickupKind::Key);
        assert_eq!(play.kill_flashes.len(), 1);
        assert_eq!(play.inventory.arrows, 4);
    }

    #[test]
    fn zero_loot_chance_never_drops() {
        let mut play = play_with(vec![Enemy::new(EnemyKind::Grunt, 400, 245, 1, 1.0)]);
        play.balance.loot_chance = 0.0;
        play.player.facing = Direction::Up;
        play.player.melee_cooldown = 0.0;
        step(&mut play, FrameInput { melee: true, ..idle() }, DT);
        assert!(play.dungeon.current_room().enemies.is_empty());
        assert!(play.pickups.is_empty());
        assert_eq!(play.kill_flashes.len(), 1);
    }

    #[test]
    fn shield_blocks_contact_damage() {
        let mut play = play_with(vec![Enemy::new(EnemyKind::Grunt, 400, 300, 5, 1.0)]);
        step(&mut play, FrameInput { shield: true, ..idle() }, DT);
        assert_eq!(play.player.hp, 3);
        let events = step(&mut play, idle(), DT);
        assert_eq!(play.player.hp, 2);
        assert!(events.contains(&GameEvent::PlayerHurt { hp: 2 }));
        assert!(play.shake.intensity >= 6);
    }

    #[test]
    fn game_over_fires_once() {
        let mut play = play_with(vec![]);
        play.player.hp = 0;
        let mut over = 0;
        for _ in 0..60 {
            let events = step(&mut play, idle(), DT);
            over += events.iter().filter(|e| **e == GameEvent::GameOver).count();
            begin_game_over(&mut play);
        }
        assert_eq!(over, 1);
        assert_eq!(play.transition, Transition::Finished);
        assert!(step(&mut play, idle(), DT).is_empty());
    }

    #[test]
    fn game_over_supersedes_room_fade() {
        let mut play = play_with(vec![]);
        play.transition = Transition::FadingOut { target: FadeTarget::Room(Direction::Up), elapsed: 0.1 };
        begin_game_over(&mut play);
        assert_eq!(play.transition, Transition::FadingOut { target: FadeTarget::GameOver, elapsed: 0.0 });
    }

    #[test]
    fn walking_through_open_door_switches_room() {
        let mut play = play_with(vec![]);
        step(&mut play, idle(), DT);
        play.player.place_at(400, 80);

        let mut entered = false;
        for _ in 0..30 {
            let events = step(&mut play, idle(), DT);
            entered |= events.iter().any(|e| matches!(e, GameEvent::RoomEntered { pos: (0, -1) }));
        }
        assert!(entered);
        assert_eq!(play.dungeon.current(), (0, -1));
        assert_eq!(play.player.rect.center(), (400, SCREEN_H - ENTRY_OFFSET));
        assert!(play.dungeon.current_room().spawned);
        assert_eq!(play.transition, Transition::Idle);
        assert!(play.door_rearm);
    }

    #[test]
    fn second_door_is_ignored_while_fading_out() {
        let mut play = play_with(vec![]);
        step(&mut play, idle(), DT);
        assert!(play.dungeon.current_room().door(Direction::Left).open);

        play.player.place_at(400, 80);
        step(&mut play, idle(), DT);
        assert!(matches!(
            play.transition,
            Transition::FadingOut { target: FadeTarget::Room(Direction::Up), .. }
        ));

        // Standing in the left door mid-fade must not retarget the fade.
        play.player.place_at(80, 300);
        step(&mut play, idle(), DT);
        assert!(matches!(
            play.transition,
            Transition::FadingOut { target: FadeTarget::Room(Direction::Up), .. }
        ));

        for _ in 0..30 {
            step(&mut play, idle(), DT);
        }
        assert_eq!(play.dungeon.current(), (0, -1));
    }

    #[test]
    fn door_cooldown_blocks_trigger() {
        let mut play = play_with(vec![]);
        step(&mut play, idle(), DT);
        play.player.place_at(400, 80);

        play.door_cooldown = 0.1;
        resolve_door_triggers(&mut play);
        assert!(play.transition.is_idle());

        play.door_cooldown = 0.0;
        resolve_door_triggers(&mut play);
        assert_eq!(
            play.transition,
            Transition::FadingOut { target: FadeTarget::Room(Direction::Up), elapsed: 0.0 }
        );
    }

    #[test]
    fn locked_door_needs_a_key() {
        let mut play = play_with(vec![]);
        step(&mut play, idle(), DT);
        play.player.place_at(SCREEN_W - 80, 300);

        let events = step(&mut play, FrameInput { interact: true, ..idle() }, DT);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::DoorUnlocked { .. })));
        assert!(play.transition.is_idle());

        play.inventory.keys = 1;
        let events = step(&mut play, FrameInput { interact: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::DoorUnlocked { dir: Direction::Right }));
        assert_eq!(play.inventory.keys, 0);
        assert!(!play.dungeon.room((1, 0)).unwrap().door(Direction::Left).locked);
    }

    #[test]
    fn walking_over_pickup_collects_it() {
        let mut play = play_with(vec![]);
        play.pickups.push(Pickup::new(PickupKind::Bomb, 400, 300));
        let events = step(&mut play, idle(), DT);
        assert!(events.contains(&GameEvent::PickedUp { kind: PickupKind::Bomb }));
        assert_eq!(play.inventory.bombs, 2);
        assert!(play.pickups.is_empty());
    }

    #[test]
    fn bomb_hits_everything_in_blast() {
        let mut play = play_with(vec![
            Enemy::new(EnemyKind::Brute, 470, 300, 3, 1.0),
            Enemy::new(EnemyKind::Grunt, 330, 300, 2, 1.0),
            Enemy::new(EnemyKind::Grunt, 700, 500, 2, 1.0),
        ]);
        play.balance.loot_chance = 0.0;
        let events = step(&mut play, FrameInput { bomb: true, shield: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::BombExploded));
        assert_eq!(play.inventory.bombs, 0);
        assert_eq!(play.dungeon.current_room().enemies.len(), 1);
    }

    #[test]
    fn companion_from_chest_fires_spikes() {
        let mut play = play_with(vec![Enemy::new(EnemyKind::Brute, 500, 300, 3, 1.0)]);
        apply_chest_item(&mut play, ChestItem::Companion);
        assert!(play.companion.is_some());
        step(&mut play, FrameInput { shield: true, ..idle() }, DT);
        assert_eq!(play.spikes.len(), 3);
    }

    #[test]
    fn load_into_other_room_resets_scene() {
        let mut play = play_with(vec![]);
        play.pickups.push(Pickup::new(PickupKind::Key, 200, 200));
        play.arrows.push(Arrow::new(400, 300, Direction::Up));
        play.transition = Transition::FadingIn { elapsed: 0.05 };
        assert!(play.dungeon.set_current((-1, 0)));

        resume_after_load(&mut play, (0, 0));
        assert!(play.pickups.is_empty());
        assert!(play.arrows.is_empty());
        assert!(play.transition.is_idle());
        assert!(play.dungeon.current_room().spawned);
        assert!(play.door_rearm);
    }

    #[test]
    fn health_doubler_applies_once() {
        let mut play = play_with(vec![]);
        apply_chest_item(&mut play, ChestItem::HealthDoubler);
        apply_chest_item(&mut play, ChestItem::HealthDoubler);
        assert_eq!(play.player.max_hp, 6);
        assert_eq!(play.player.hp, 6);
    }
}
