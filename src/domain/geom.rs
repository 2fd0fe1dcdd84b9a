/// Screen-space geometry shared by every entity.
///
/// The play field is a fixed 800×600 pixel space. Entities carry integer
/// rectangles (movement truncates toward zero each tick), projectiles
/// carry float positions and project them onto a rectangle for collision.

use std::ops::{Add, Mul, Sub};

pub const SCREEN_W: i32 = 800;
pub const SCREEN_H: i32 = 600;

// ── Rect ──

/// Axis-aligned integer rectangle. `x`/`y` is the top-left corner.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// Rectangle of the given size whose centre lands on `(cx, cy)`.
    pub const fn centered(cx: i32, cy: i32, w: i32, h: i32) -> Self {
        Rect { x: cx - w / 2, y: cy - h / 2, w, h }
    }

    pub fn left(&self) -> i32 { self.x }
    pub fn top(&self) -> i32 { self.y }
    pub fn right(&self) -> i32 { self.x + self.w }
    pub fn bottom(&self) -> i32 { self.y + self.h }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    pub fn center_x(&self) -> i32 { self.x + self.w / 2 }
    pub fn center_y(&self) -> i32 { self.y + self.h / 2 }

    pub fn set_center(&mut self, cx: i32, cy: i32) {
        self.x = cx - self.w / 2;
        self.y = cy - self.h / 2;
    }

    pub fn set_center_x(&mut self, cx: i32) { self.x = cx - self.w / 2; }
    pub fn set_center_y(&mut self, cy: i32) { self.y = cy - self.h / 2; }

    /// Strict overlap test. Touching edges do not overlap and empty
    /// rectangles never overlap anything.
    pub fn overlaps(&self, other: &Rect) -> bool {
        if self.w <= 0 || self.h <= 0 || other.w <= 0 || other.h <= 0 {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn overlaps_any(&self, others: &[Rect]) -> bool {
        others.iter().any(|o| self.overlaps(o))
    }

    /// Grow (or shrink, with negative deltas) around the same centre.
    pub fn inflate(&self, dw: i32, dh: i32) -> Rect {
        Rect::new(self.x - dw / 2, self.y - dh / 2, self.w + dw, self.h + dh)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

// ── Vec2 ──

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Vector from one integer point to another.
    pub fn between(from: (i32, i32), to: (i32, i32)) -> Self {
        Vec2::new((to.0 - from.0) as f32, (to.1 - from.1) as f32)
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction; the zero vector stays zero.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 { Vec2::new(self.x / len, self.y / len) } else { Vec2::ZERO }
    }

    /// Left-hand perpendicular `(-y, x)`.
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn from_angle(angle: f32) -> Vec2 {
        Vec2::new(angle.cos(), angle.sin())
    }

    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 { Vec2::new(self.x + o.x, self.y + o.y) }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 { Vec2::new(self.x - o.x, self.y - o.y) }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f32) -> Vec2 { Vec2::new(self.x * s, self.y * s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&b.translated(-1, 0)));
    }

    #[test]
    fn empty_rect_never_overlaps() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(!a.overlaps(&Rect::new(5, 5, 0, 0)));
    }

    #[test]
    fn inflate_keeps_center() {
        let r = Rect::centered(400, 300, 32, 32);
        let big = r.inflate(60, 60);
        assert_eq!(big.center(), (400, 300));
        assert_eq!((big.w, big.h), (92, 92));
    }

    #[test]
    fn centered_round_trips_through_center() {
        let mut r = Rect::centered(121, 341, 40, 40);
        assert_eq!(r.center(), (121, 341));
        r.set_center(10, 20);
        assert_eq!(r.center(), (10, 20));
    }

    #[test]
    fn normalizing_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalized();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }
}
