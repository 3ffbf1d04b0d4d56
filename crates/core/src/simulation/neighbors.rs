//! Downhill neighbor selection and scan ordering
//!
//! Each step picks, from the 8 surrounding offsets, those that lie within unit
//! distance of the normalized gravity direction. At most three qualify: the
//! offset gravity points at and its two compass neighbors.

use nalgebra::Vector2;
use rand::seq::SliceRandom;
use rand::Rng;

/// Offsets whose distances differ by no more than this are treated as tied.
pub const TIE_EPSILON: f64 = 1e-3;

/// A neighbor offset and its squared distance to the gravity direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub dx: i32,
    pub dy: i32,
    pub distance: f64,
}

/// True if gravity can be normalized (finite and non-zero length).
pub fn is_usable_gravity(gravity: Vector2<f64>) -> bool {
    let norm = gravity.norm();
    norm.is_finite() && norm > 0.0
}

/// Ordered downhill offsets for one step.
///
/// Offsets are sorted by ascending distance; runs of tied offsets are shuffled
/// with `rng` so diagonal flow does not win every tick. Degenerate gravity
/// yields no candidates.
pub fn downhill_candidates<R: Rng + ?Sized>(gravity: Vector2<f64>, rng: &mut R) -> Vec<Candidate> {
    if !is_usable_gravity(gravity) {
        return Vec::new();
    }
    let g = gravity.normalize();

    let mut candidates = Vec::with_capacity(3);
    for dx in -1..=1 {
        for dy in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let distance = (f64::from(dx) - g.x).powi(2) + (f64::from(dy) - g.y).powi(2);
            if distance < 1.0 {
                candidates.push(Candidate { dx, dy, distance });
            }
        }
    }

    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut start = 0;
    while start < candidates.len() {
        let anchor = candidates[start].distance;
        let end = candidates[start..]
            .iter()
            .position(|c| c.distance - anchor > TIE_EPSILON)
            .map_or(candidates.len(), |offset| start + offset);
        candidates[start..end].shuffle(rng);
        start = end;
    }

    candidates
}

/// True for the single diagonal move between `(-1, -1)` and `(0, 0)`.
#[inline]
pub fn is_neck_crossing(x: i32, y: i32, dx: i32, dy: i32) -> bool {
    x * 2 + dx == -1 && y * 2 + dy == -1
}

/// Grid traversal order for one step.
///
/// Scanning starts at the edge gravity points toward and walks against it, so
/// a grain that just moved into an already visited cell is not moved again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOrder {
    pub start_x: i32,
    pub start_y: i32,
    pub step_x: i32,
    pub step_y: i32,
    n: i32,
}

impl ScanOrder {
    /// Derive the order from the raw (unnormalized) gravity vector.
    pub fn from_gravity(gravity: Vector2<f64>, n: i32) -> Self {
        let (start_x, step_x) = if gravity.x >= 0.0 { (n - 1, -1) } else { (-n, 1) };
        let (start_y, step_y) = if gravity.y >= 0.0 { (n - 1, -1) } else { (-n, 1) };
        Self {
            start_x,
            start_y,
            step_x,
            step_y,
            n,
        }
    }

    /// Column sequence covering `[-n, n)`
    pub fn xs(&self) -> impl Iterator<Item = i32> {
        let (start, step) = (self.start_x, self.step_x);
        (0..2 * self.n).map(move |k| start + step * k)
    }

    /// Row sequence covering `[-n, n)`
    pub fn ys(&self) -> impl Iterator<Item = i32> {
        let (start, step) = (self.start_y, self.step_y);
        (0..2 * self.n).map(move |k| start + step * k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn offsets(candidates: &[Candidate]) -> Vec<(i32, i32)> {
        candidates.iter().map(|c| (c.dx, c.dy)).collect()
    }

    #[test]
    fn test_axis_gravity_has_single_candidate() {
        let mut rng = StdRng::seed_from_u64(1);
        let c = downhill_candidates(Vector2::new(0.0, 1.0), &mut rng);
        assert_eq!(offsets(&c), vec![(0, 1)]);

        let c = downhill_candidates(Vector2::new(-3.0, 0.0), &mut rng);
        assert_eq!(offsets(&c), vec![(-1, 0)]);
    }

    #[test]
    fn test_diagonal_gravity_ties_are_shuffled() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen_x_first = false;
        let mut seen_y_first = false;

        for _ in 0..64 {
            let c = downhill_candidates(Vector2::new(1.0, 1.0), &mut rng);
            assert_eq!(c.len(), 3);
            assert_eq!((c[0].dx, c[0].dy), (1, 1));
            match (c[1].dx, c[1].dy) {
                (1, 0) => seen_x_first = true,
                (0, 1) => seen_y_first = true,
                other => panic!("unexpected second candidate {other:?}"),
            }
        }

        assert!(seen_x_first && seen_y_first);
    }

    #[test]
    fn test_near_ties_are_shuffled_together() {
        let mut rng = StdRng::seed_from_u64(11);
        let gravity = Vector2::new(1.0, 1.0003);
        let mut seen = [false; 2];

        for _ in 0..64 {
            let c = downhill_candidates(gravity, &mut rng);
            assert_eq!(c.len(), 3);
            assert_eq!((c[0].dx, c[0].dy), (1, 1));

            let gap = (c[1].distance - c[2].distance).abs();
            assert!(gap > 0.0 && gap < TIE_EPSILON, "gap {gap} is not a near tie");

            match (c[1].dx, c[1].dy) {
                (0, 1) => seen[0] = true,
                (1, 0) => seen[1] = true,
                other => panic!("unexpected second candidate {other:?}"),
            }
        }

        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_candidates_sorted_by_distance() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = downhill_candidates(Vector2::new(0.9, 0.4), &mut rng);
        assert!(!c.is_empty());
        assert!(c.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!((c[0].dx, c[0].dy), (1, 0));
    }

    #[test]
    fn test_degenerate_gravity_has_no_candidates() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(downhill_candidates(Vector2::new(0.0, 0.0), &mut rng).is_empty());
        assert!(downhill_candidates(Vector2::new(f64::NAN, 1.0), &mut rng).is_empty());
        assert!(downhill_candidates(Vector2::new(f64::INFINITY, 0.0), &mut rng).is_empty());
    }

    #[test]
    fn test_neck_crossing() {
        assert!(is_neck_crossing(0, 0, -1, -1));
        assert!(is_neck_crossing(-1, -1, 1, 1));
        assert!(!is_neck_crossing(-1, -1, 1, 0));
        assert!(!is_neck_crossing(0, 0, 1, 1));
        assert!(!is_neck_crossing(-2, -2, 1, 1));
    }

    #[test]
    fn test_scan_order_covers_both_chambers() {
        let order = ScanOrder::from_gravity(Vector2::new(1.0, -1.0), 3);
        assert_eq!(order.xs().collect::<Vec<_>>(), vec![2, 1, 0, -1, -2, -3]);
        assert_eq!(order.ys().collect::<Vec<_>>(), vec![-3, -2, -1, 0, 1, 2]);
    }
}
