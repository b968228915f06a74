//! Two-dimensional k-d tree for nearest-neighbour lookups.
//!
//! Points are (lat, lon) pairs in degrees and distances are planar:
//! `sqrt(dlat^2 + dlon^2)`. That is a flat approximation which stretches
//! east-west distances towards the poles; it does not wrap at the
//! antimeridian either.
//!
//! The tree is stored implicitly: each slice's median element is the node,
//! the left half holds smaller coordinates on the split axis and the right
//! half larger ones. Build is O(n log n) by repeated median selection.

/// Slices at or below this size are scanned linearly.
const LEAF_SIZE: usize = 8;

/// Subtrees above this size are built on separate rayon tasks.
const PARALLEL_BUILD_THRESHOLD: usize = 32_768;

#[derive(Debug, Clone, Copy)]
struct Entry {
    point: [f64; 2],
    index: usize,
}

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the point in the input it was built from.
    pub index: usize,
    /// Planar distance in degrees.
    pub distance: f64,
}

/// Static nearest-neighbour index over (lat, lon) points.
#[derive(Debug, Clone)]
pub struct KdTree {
    entries: Vec<Entry>,
}

impl KdTree {
    /// Build from parallel latitude/longitude arrays.
    ///
    /// Points with a non-finite coordinate are left out; indices returned by
    /// queries still refer to positions in the input arrays.
    pub fn from_coordinates(lat: &[f64], lon: &[f64]) -> Self {
        let entries = lat
            .iter()
            .zip(lon)
            .enumerate()
            .filter(|(_, (la, lo))| la.is_finite() && lo.is_finite())
            .map(|(index, (&la, &lo))| Entry {
                point: [la, lo],
                index,
            })
            .collect();
        Self::from_entries(entries)
    }

    /// Build from explicit points; the i-th point gets index i.
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(index, &point)| Entry { point, index })
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(mut entries: Vec<Entry>) -> Self {
        build(&mut entries, 0);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest indexed point to `(lat, lon)`, or `None` for an empty tree.
    ///
    /// Ties keep the first point encountered during the descent.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<Neighbor> {
        if self.entries.is_empty() {
            return None;
        }
        let query = [lat, lon];
        let mut best = Best {
            index: usize::MAX,
            dist2: f64::INFINITY,
        };
        search(&self.entries, 0, query, &mut best);
        Some(Neighbor {
            index: best.index,
            distance: best.dist2.sqrt(),
        })
    }
}

struct Best {
    index: usize,
    dist2: f64,
}

fn build(entries: &mut [Entry], depth: usize) {
    if entries.len() <= LEAF_SIZE {
        return;
    }
    let axis = depth % 2;
    let mid = entries.len() / 2;
    entries.select_nth_unstable_by(mid, |a, b| a.point[axis].total_cmp(&b.point[axis]));

    let (left, rest) = entries.split_at_mut(mid);
    let right = &mut rest[1..];
    if left.len() + right.len() > PARALLEL_BUILD_THRESHOLD {
        rayon::join(|| build(left, depth + 1), || build(right, depth + 1));
    } else {
        build(left, depth + 1);
        build(right, depth + 1);
    }
}

fn search(entries: &[Entry], depth: usize, query: [f64; 2], best: &mut Best) {
    if entries.len() <= LEAF_SIZE {
        for e in entries {
            visit(e, query, best);
        }
        return;
    }

    let axis = depth % 2;
    let mid = entries.len() / 2;
    let node = &entries[mid];
    visit(node, query, best);

    let diff = query[axis] - node.point[axis];
    let (near, far) = if diff < 0.0 {
        (&entries[..mid], &entries[mid + 1..])
    } else {
        (&entries[mid + 1..], &entries[..mid])
    };

    search(near, depth + 1, query, best);
    if diff * diff < best.dist2 {
        search(far, depth + 1, query, best);
    }
}

#[inline]
fn visit(entry: &Entry, query: [f64; 2], best: &mut Best) {
    let dlat = entry.point[0] - query[0];
    let dlon = entry.point[1] - query[1];
    let d2 = dlat * dlat + dlon * dlon;
    if d2 < best.dist2 {
        best.dist2 = d2;
        best.index = entry.index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[[f64; 2]], q: [f64; 2]) -> (usize, f64) {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt()))
            .fold((usize::MAX, f64::INFINITY), |acc, x| if x.1 < acc.1 { x } else { acc })
    }

    /// Deterministic scattered points (linear congruential sequence).
    fn scattered(n: usize) -> Vec<[f64; 2]> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        (0..n)
            .map(|_| [20.0 + next() * 35.0, -130.0 + next() * 70.0])
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::from_points(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn test_exact_hit_has_zero_distance() {
        let points = scattered(500);
        let tree = KdTree::from_points(&points);
        for (i, p) in points.iter().enumerate().step_by(37) {
            let hit = tree.nearest(p[0], p[1]).unwrap();
            assert_eq!(hit.index, i);
            assert_eq!(hit.distance, 0.0);
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let points = scattered(2_000);
        let tree = KdTree::from_points(&points);
        for q in scattered(300).iter().map(|p| [p[0] + 0.013, p[1] - 0.021]) {
            let hit = tree.nearest(q[0], q[1]).unwrap();
            let (_, expected) = brute_force(&points, q);
            assert!((hit.distance - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_skips_non_finite_coordinates() {
        let lat = [10.0, f64::NAN, 30.0];
        let lon = [-100.0, -95.0, f64::INFINITY];
        let tree = KdTree::from_coordinates(&lat, &lon);
        assert_eq!(tree.len(), 1);
        let hit = tree.nearest(29.0, -95.0).unwrap();
        assert_eq!(hit.index, 0);
    }

    #[test]
    fn test_indices_survive_filtering() {
        let lat = [f64::NAN, 40.0, 41.0];
        let lon = [0.0, -100.0, -101.0];
        let tree = KdTree::from_coordinates(&lat, &lon);
        assert_eq!(tree.nearest(41.1, -101.1).unwrap().index, 2);
    }

    #[test]
    fn test_large_build_uses_parallel_path() {
        let points = scattered(PARALLEL_BUILD_THRESHOLD * 2);
        let tree = KdTree::from_points(&points);
        let q = [37.5, -97.25];
        let (expected_idx, expected) = brute_force(&points, q);
        let hit = tree.nearest(q[0], q[1]).unwrap();
        assert!((hit.distance - expected).abs() < 1e-12);
        assert_eq!(hit.index, expected_idx);
    }
}
