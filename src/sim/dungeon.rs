/// Dungeon: a fixed 3×3 grid of rooms and the current-room cursor.
///
/// Rooms never reference each other. A door shared by two rooms is stored
/// twice (once per side) and kept identical by `sync_doors()`; every door
/// mutation here finishes by re-establishing that mirror.

use crate::domain::room::{Direction, Door, Room};

/// Grid coordinates span -1..=1 on both axes.
pub const GRID_MIN: i32 = -1;
pub const GRID_MAX: i32 = 1;
const GRID_SPAN: i32 = GRID_MAX - GRID_MIN + 1;

pub const START_ROOM: (i32, i32) = (0, 0);

/// Row-major slot of a grid coordinate, `None` off the grid.
fn slot(pos: (i32, i32)) -> Option<usize> {
    let (gx, gy) = pos;
    let on_grid = |v: i32| (GRID_MIN..=GRID_MAX).contains(&v);
    if !on_grid(gx) || !on_grid(gy) {
        return None;
    }
    Some(((gy - GRID_MIN) * GRID_SPAN + (gx - GRID_MIN)) as usize)
}

#[derive(Clone, Debug)]
pub struct Dungeon {
    /// Every grid cell, in `slot()` order. Never resized.
    rooms: Vec<Room>,
    /// Only ever assigned from `slot()`, so it always indexes `rooms`.
    current: usize,
}

impl Dungeon {
    /// Fresh layout: the start room's right door is locked, every other
    /// door of the start room is open.
    pub fn new() -> Self {
        let mut rooms = Vec::with_capacity((GRID_SPAN * GRID_SPAN) as usize);
        for gy in GRID_MIN..=GRID_MAX {
            for gx in GRID_MIN..=GRID_MAX {
                rooms.push(Room::new((gx, gy)));
            }
        }
        let current = slot(START_ROOM).unwrap_or_default();
        let mut dungeon = Dungeon { rooms, current };
        *dungeon.current_room_mut().door_mut(Direction::Right) = Door::LOCKED;
        dungeon.sync_doors();
        dungeon.open_all_unlocked_in_current();
        dungeon
    }

    pub fn current(&self) -> (i32, i32) {
        self.current_room().pos
    }

    pub fn current_room(&self) -> &Room {
        &self.rooms[self.current]
    }

    pub fn current_room_mut(&mut self) -> &mut Room {
        &mut self.rooms[self.current]
    }

    pub fn room(&self, pos: (i32, i32)) -> Option<&Room> {
        slot(pos).map(|i| &self.rooms[i])
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    /// Jump the cursor (used by save loading). Rejects unknown cells.
    pub fn set_current(&mut self, pos: (i32, i32)) -> bool {
        match slot(pos) {
            Some(i) => {
                self.current = i;
                true
            }
            None => false,
        }
    }

    /// Step into the neighbour. Fails without side effects if there is no
    /// room that way or the door is not open.
    pub fn move_through(&mut self, dir: Direction) -> bool {
        let room = self.current_room();
        match slot(room.neighbor(dir)) {
            Some(i) if room.door(dir).open => {
                self.current = i;
                true
            }
            _ => false,
        }
    }

    /// Unlock (and open) a door of the current room. Already-unlocked doors
    /// are left untouched.
    pub fn unlock(&mut self, dir: Direction) -> bool {
        let door = self.current_room_mut().door_mut(dir);
        if !door.locked {
            return true;
        }
        *door = Door { open: true, locked: false };
        self.sync_doors();
        true
    }

    /// Open or close every door of the current room, mirroring each change
    /// to the neighbour. Locked doors are never opened; with
    /// `only_unlocked` they are skipped entirely.
    pub fn set_current_doors_open(&mut self, open: bool, only_unlocked: bool) {
        let pos = self.current();
        for dir in Direction::ALL {
            let door = self.current_room_mut().door_mut(dir);
            if only_unlocked && door.locked {
                continue;
            }
            door.open = open && !door.locked;
            let mirrored = *door;
            if let Some(i) = slot(dir.step(pos)) {
                *self.rooms[i].door_mut(dir.opposite()) = mirrored;
            }
        }
    }

    pub fn open_all_unlocked_in_current(&mut self) {
        self.set_current_doors_open(true, true);
    }

    /// Re-establish the mirror for every adjacent pair.
    ///
    /// The current room is authoritative for its own doors. Remaining
    /// pairs copy from the lower coordinate onto the higher one, so the
    /// pass is idempotent and independent of iteration history.
    pub fn sync_doors(&mut self) {
        let pos = self.current();
        for dir in Direction::ALL {
            let door = self.current_room().door(dir);
            if let Some(i) = slot(dir.step(pos)) {
                *self.rooms[i].door_mut(dir.opposite()) = door;
            }
        }

        for here in 0..self.rooms.len() {
            for dir in [Direction::Right, Direction::Down] {
                let Some(there) = slot(dir.step(self.rooms[here].pos)) else { continue };
                if here == self.current || there == self.current {
                    continue;
                }
                let door = self.rooms[here].door(dir);
                *self.rooms[there].door_mut(dir.opposite()) = door;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_mirrored(d: &Dungeon) {
        for room in d.rooms() {
            for dir in Direction::ALL {
                if let Some(n) = d.room(room.neighbor(dir)) {
                    assert_eq!(
                        room.door(dir),
                        n.door(dir.opposite()),
                        "{:?} {:?} vs {:?}",
                        room.pos,
                        dir,
                        n.pos
                    );
                }
            }
        }
    }

    #[test]
    fn fresh_dungeon_layout() {
        let d = Dungeon::new();
        assert_eq!(d.rooms().count(), 9);
        for gx in -1..=1 {
            for gy in -1..=1 {
                assert!(d.room((gx, gy)).is_some());
            }
        }
        assert_eq!(d.current(), (0, 0));
        let start = d.current_room();
        assert_eq!(start.door(Direction::Right), Door::LOCKED);
        assert_eq!(d.room((1, 0)).unwrap().door(Direction::Left), Door::LOCKED);
        for dir in [Direction::Up, Direction::Down, Direction::Left] {
            assert!(start.door(dir).open);
        }
        assert_mirrored(&d);
    }

    #[test]
    fn cursor_only_lands_on_grid_cells() {
        let mut d = Dungeon::new();
        for pos in [(2, 0), (0, -2), (-1, 5)] {
            assert!(!d.set_current(pos));
            assert_eq!(d.current(), (0, 0));
        }
        for room_pos in d.rooms().map(|r| r.pos).collect::<Vec<_>>() {
            assert!(d.set_current(room_pos));
            assert_eq!(d.current(), room_pos);
            assert_eq!(d.current_room_mut().pos, room_pos);
        }
    }

    #[test]
    fn move_through_locked_door_fails() {
        let mut d = Dungeon::new();
        assert!(!d.move_through(Direction::Right));
        assert_eq!(d.current(), (0, 0));
    }

    #[test]
    fn move_through_open_door_and_back() {
        let mut d = Dungeon::new();
        assert!(d.move_through(Direction::Up));
        assert_eq!(d.current(), (0, -1));
        assert!(d.move_through(Direction::Down));
        assert_eq!(d.current(), (0, 0));
    }

    #[test]
    fn move_off_the_grid_fails() {
        let mut d = Dungeon::new();
        assert!(d.move_through(Direction::Up));
        d.set_current_doors_open(true, false);
        assert!(d.current_room().door(Direction::Up).open);
        assert!(!d.move_through(Direction::Up));
        assert_eq!(d.current(), (0, -1));
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut d = Dungeon::new();
        assert!(d.unlock(Direction::Right));
        let once = d.clone();
        assert!(d.unlock(Direction::Right));
        assert_eq!(d.current_room().door(Direction::Right), Door { open: true, locked: false });
        for room in once.rooms() {
            for dir in Direction::ALL {
                assert_eq!(room.door(dir), d.room(room.pos).unwrap().door(dir));
            }
        }
        assert_mirrored(&d);
        assert!(d.move_through(Direction::Right));
    }

    #[test]
    fn closing_skips_locked_doors() {
        let mut d = Dungeon::new();
        d.set_current_doors_open(false, true);
        let start = d.current_room();
        assert_eq!(start.door(Direction::Right), Door::LOCKED);
        assert!(!start.door(Direction::Up).open);
        assert_mirrored(&d);
        d.set_current_doors_open(true, false);
        assert_eq!(d.current_room().door(Direction::Right), Door::LOCKED);
        assert_mirrored(&d);
    }

    #[test]
    fn sync_is_idempotent() {
        let mut d = Dungeon::new();
        d.sync_doors();
        let before: Vec<_> = d.rooms().map(|r| Direction::ALL.map(|x| r.door(x))).collect();
        d.sync_doors();
        let after: Vec<_> = d.rooms().map(|r| Direction::ALL.map(|x| r.door(x))).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn random_walk_keeps_doors_mirrored() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut d = Dungeon::new();
        for _ in 0..500 {
            let dir = Direction::ALL[rng.gen_range(0..4)];
            match rng.gen_range(0..4) {
                0 => { d.move_through(dir); }
                1 => { d.unlock(dir); }
                2 => d.set_current_doors_open(rng.gen(), rng.gen()),
                _ => d.sync_doors(),
            }
            assert_mirrored(&d);
        }
    }
}
