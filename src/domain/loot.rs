/// Weighted draws used for enemy spawns and kill loot.
///
/// Weight tables are normalised at draw time; negative weights count as
/// zero and the weights need not sum to one.

use rand::Rng;

use super::entity::PickupKind;

/// Pick one entry proportionally to its weight.
///
/// Returns `None` when no entry has a positive weight, so an empty or
/// all-zero table never produces anything.
pub fn weighted_pick<T: Copy, R: Rng>(table: &[(T, f32)], rng: &mut R) -> Option<T> {
    let total: f32 = table.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let roll = rng.gen::<f32>() * total;
    let mut acc = 0.0;
    let mut last_positive = None;
    for &(item, w) in table {
        let w = w.max(0.0);
        if w == 0.0 {
            continue;
        }
        acc += w;
        last_positive = Some(item);
        if roll < acc {
            return Some(item);
        }
    }
    last_positive
}

/// Loot-on-kill: a chance gate, then a kind draw.
pub fn roll_loot<R: Rng>(chance: f32, weights: &[(PickupKind, f32)], rng: &mut R) -> Option<PickupKind> {
    if rng.gen::<f32>() >= chance {
        return None;
    }
    weighted_pick(weights, rng)
}
