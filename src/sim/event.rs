/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound; the scene host
/// consumes `GameOver` to switch scenes.

use crate::domain::entity::{ChestItem, PickupKind};
use crate::domain::room::Direction;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameEvent {
    DoorOpened,
    DoorUnlocked { dir: Direction },
    ArrowShot,
    ArrowHit,
    EnemyKilled { x: i32, y: i32 },
    LootDropped { kind: PickupKind, x: i32, y: i32 },
    PlayerHurt { hp: i32 },
    PickedUp { kind: PickupKind },
    ChestOpened { item: ChestItem },
    ChargeStarted,
    BombExploded,
    RoomEntered { pos: (i32, i32) },
    RoomCleared { pos: (i32, i32) },
    /// Game-over fade finished: the host should leave the play scene.
    GameOver,
}
