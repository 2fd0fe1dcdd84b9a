/// Rooms: one cell of the dungeon grid.
///
/// Static geometry (walls, door trigger zones, obstacles) is a pure
/// function of the room's grid coordinate and the obstacle parameters in
/// effect. Mutable state (doors, cleared/spawned flags, enemies, chests)
/// lives on `Room` and persists for the dungeon's lifetime.

use super::enemy::Enemy;
use super::entity::Chest;
use super::geom::{Rect, SCREEN_H, SCREEN_W};

pub const TILE: i32 = 32;
pub const ROOM_PADDING: i32 = 48;
pub const WALL_THICKNESS: i32 = 10;

const DOOR_LONG: i32 = 60;
const DOOR_SHORT: i32 = 20;
/// Door trigger rects poke this far outside the wall line.
const DOOR_INSET: i32 = 5;

// ══════════════════════════════════════════════════════════════
// Direction / Door
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed evaluation order for door checks.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Grid offset. Up is negative y.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn step(self, pos: (i32, i32)) -> (i32, i32) {
        let (dx, dy) = self.offset();
        (pos.0 + dx, pos.1 + dy)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A door is open, closed, or locked (and therefore closed).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Door {
    pub open: bool,
    pub locked: bool,
}

impl Door {
    pub const LOCKED: Door = Door { open: false, locked: true };
}

// ══════════════════════════════════════════════════════════════
// Room
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Room {
    pub pos: (i32, i32),
    doors: [Door; 4],
    pub cleared: bool,
    pub spawned: bool,
    pub enemies: Vec<Enemy>,
    pub chests: Vec<Chest>,
}

impl Room {
    pub fn new(pos: (i32, i32)) -> Self {
        Room {
            pos,
            doors: [Door::default(); 4],
            cleared: false,
            spawned: false,
            enemies: Vec::new(),
            chests: Vec::new(),
        }
    }

    pub fn door(&self, dir: Direction) -> Door {
        self.doors[dir.index()]
    }

    pub fn door_mut(&mut self, dir: Direction) -> &mut Door {
        &mut self.doors[dir.index()]
    }

    pub fn neighbor(&self, dir: Direction) -> (i32, i32) {
        dir.step(self.pos)
    }

    pub fn has_live_enemies(&self) -> bool {
        self.enemies.iter().any(|e| e.alive)
    }
}

// ══════════════════════════════════════════════════════════════
// Static geometry
// ══════════════════════════════════════════════════════════════

/// The four boundary walls. Identical for every room.
pub fn walls() -> [Rect; 4] {
    let p = ROOM_PADDING;
    let t = WALL_THICKNESS;
    [
        Rect::new(p, p, SCREEN_W - 2 * p, t),
        Rect::new(p, SCREEN_H - p - t, SCREEN_W - 2 * p, t),
        Rect::new(p, p, t, SCREEN_H - 2 * p),
        Rect::new(SCREEN_W - p - t, p, t, SCREEN_H - 2 * p),
    ]
}

/// Trigger zone for a door. Overlapping an open door's zone starts a
/// room transition; overlapping a locked one allows a key unlock.
pub fn door_rect(dir: Direction) -> Rect {
    let p = ROOM_PADDING;
    match dir {
        Direction::Up => Rect::new(SCREEN_W / 2 - DOOR_LONG / 2, p - DOOR_INSET, DOOR_LONG, DOOR_SHORT),
        Direction::Down => Rect::new(
            SCREEN_W / 2 - DOOR_LONG / 2,
            SCREEN_H - p - DOOR_SHORT + DOOR_INSET,
            DOOR_LONG,
            DOOR_SHORT,
        ),
        Direction::Left => Rect::new(p - DOOR_INSET, SCREEN_H / 2 - DOOR_LONG / 2, DOOR_SHORT, DOOR_LONG),
        Direction::Right => Rect::new(
            SCREEN_W - p - DOOR_SHORT + DOOR_INSET,
            SCREEN_H / 2 - DOOR_LONG / 2,
            DOOR_SHORT,
            DOOR_LONG,
        ),
    }
}

/// Area in front of each door that obstacles are never allowed to block.
pub fn door_approach(dir: Direction) -> Rect {
    let p = ROOM_PADDING;
    let (cx, cy) = (SCREEN_W / 2, SCREEN_H / 2);
    let wide = 3 * TILE;
    let deep = 2 * TILE;
    match dir {
        Direction::Up => Rect::new(cx - wide / 2, p, wide, deep),
        Direction::Down => Rect::new(cx - wide / 2, SCREEN_H - p - deep, wide, deep),
        Direction::Left => Rect::new(p, cy - wide / 2, deep, wide),
        Direction::Right => Rect::new(SCREEN_W - p - deep, cy - wide / 2, deep, wide),
    }
}

/// Inputs to obstacle generation that vary with difficulty.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ObstacleParams {
    /// Probability-like threshold in [0, 1].
    pub density: f32,
    pub max_count: usize,
    pub corridor_tiles: i32,
}

impl Default for ObstacleParams {
    fn default() -> Self {
        ObstacleParams { density: 0.12, max_count: 14, corridor_tiles: 2 }
    }
}

fn room_seed(pos: (i32, i32)) -> u32 {
    (pos.0 as u32).wrapping_mul(73_856_093) ^ (pos.1 as u32).wrapping_mul(19_349_663)
}

/// Per-tile 8-bit hash: xorshift over the room seed and tile coordinate.
fn cell_hash(seed: u32, tx: i32, ty: i32) -> u32 {
    let mut v = seed
        ^ (tx as u32).wrapping_mul(2_654_435_761)
        ^ (ty as u32).wrapping_mul(97_531);
    v ^= v << 13;
    v ^= v >> 17;
    v ^= v << 5;
    v & 0xFF
}

/// Deterministic obstacle layout for the room at `pos`.
///
/// Interior tiles outside the central cross corridor become obstacles when
/// their hash falls under the density threshold. Tiles touching a door
/// approach are then discarded, and the survivors are ordered by hash and
/// capped at `max_count`.
pub fn generate_obstacles(pos: (i32, i32), params: &ObstacleParams) -> Vec<Rect> {
    let seed = room_seed(pos);
    let p = ROOM_PADDING;
    let start_x = (p + TILE - 1) / TILE * TILE;
    let start_y = start_x;
    let end_x = (SCREEN_W - p) / TILE * TILE;
    let end_y = (SCREEN_H - p) / TILE * TILE;
    let (cx, cy) = (SCREEN_W / 2, SCREEN_H / 2);
    let corridor_px = params.corridor_tiles.max(1) * TILE / 2;
    let threshold = (params.density.clamp(0.0, 1.0) * 255.0) as u32;

    let mut tiles: Vec<(u32, Rect)> = Vec::new();
    for y in (start_y..end_y).step_by(TILE as usize) {
        for x in (start_x..end_x).step_by(TILE as usize) {
            if (y + TILE / 2 - cy).abs() <= corridor_px || (x + TILE / 2 - cx).abs() <= corridor_px {
                continue;
            }
            let h = cell_hash(seed, x / TILE, y / TILE);
            if h < threshold {
                tiles.push((h, Rect::new(x, y, TILE, TILE)));
            }
        }
    }

    let approaches = Direction::ALL.map(door_approach);
    tiles.retain(|(_, r)| !r.overlaps_any(&approaches));

    // Stable: equal hashes keep scan order.
    tiles.sort_by_key(|(h, _)| *h);
    tiles.truncate(params.max_count);
    tiles.into_iter().map(|(_, r)| r).collect()
}

/// Collision geometry of the active room, computed once on room entry.
#[derive(Clone, Debug, Default)]
pub struct RoomGeometry {
    pub walls: Vec<Rect>,
    pub obstacles: Vec<Rect>,
}

impl RoomGeometry {
    pub fn for_room(pos: (i32, i32), params: &ObstacleParams) -> Self {
        RoomGeometry {
            walls: walls().to_vec(),
            obstacles: generate_obstacles(pos, params),
        }
    }

    pub fn hits_wall(&self, r: &Rect) -> bool {
        r.overlaps_any(&self.walls)
    }

    pub fn hits_obstacle(&self, r: &Rect) -> bool {
        r.overlaps_any(&self.obstacles)
    }

    /// Walls or obstacles.
    pub fn blocked(&self, r: &Rect) -> bool {
        self.hits_wall(r) || self.hits_obstacle(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor_band(r: &Rect) -> bool {
        let half = 2 * TILE / 2;
        (r.y + TILE / 2 - SCREEN_H / 2).abs() <= half || (r.x + TILE / 2 - SCREEN_W / 2).abs() <= half
    }

    #[test]
    fn same_coordinate_same_layout() {
        let params = ObstacleParams::default();
        assert_eq!(generate_obstacles((1, -1), &params), generate_obstacles((1, -1), &params));
    }

    #[test]
    fn different_coordinates_differ() {
        let params = ObstacleParams::default();
        let a = generate_obstacles((0, 0), &params);
        let b = generate_obstacles((1, 0), &params);
        assert_ne!(a, b);
    }

    #[test]
    fn origin_layout_is_stable() {
        let obs = generate_obstacles((0, 0), &ObstacleParams::default());
        assert_eq!(obs.len(), 14);
        assert_eq!(obs[0], Rect::new(480, 160, TILE, TILE));
    }

    #[test]
    fn obstacles_respect_cap_corridor_and_doors() {
        let params = ObstacleParams { density: 1.0, max_count: 1000, corridor_tiles: 2 };
        for gx in -1..=1 {
            for gy in -1..=1 {
                let obs = generate_obstacles((gx, gy), &params);
                for o in &obs {
                    assert!(!corridor_band(o), "obstacle {o:?} in corridor");
                    for d in Direction::ALL {
                        assert!(!o.overlaps(&door_approach(d)));
                    }
                }
            }
        }
        let capped = ObstacleParams { max_count: 3, ..params };
        assert_eq!(generate_obstacles((0, 0), &capped).len(), 3);
    }

    #[test]
    fn zero_density_means_no_obstacles() {
        let params = ObstacleParams { density: 0.0, ..ObstacleParams::default() };
        assert!(generate_obstacles((0, 0), &params).is_empty());
    }

    #[test]
    fn door_rects_straddle_walls() {
        let w = walls();
        assert!(door_rect(Direction::Up).overlaps(&w[0]));
        assert!(door_rect(Direction::Down).overlaps(&w[1]));
        assert!(door_rect(Direction::Left).overlaps(&w[2]));
        assert!(door_rect(Direction::Right).overlaps(&w[3]));
    }

    #[test]
    fn opposite_is_involutive() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            let back = d.opposite().step(d.step((0, 0)));
            assert_eq!(back, (0, 0));
        }
    }
}
