//! Dynamic time warping distance between two quantised feature sequences.
//!
//! The lattice is walked with a single rolling row of accumulated
//! distances plus a parallel row of step counts, so memory stays O(n)
//! for an m x n comparison. The cell cost is an integer-scaled cosine
//! distance and the result is the optimal path's total cost divided by
//! its step count.

use crate::constants::DISTANCE_SCALE;
use crate::mfcc::SoundFeature;

/// Sentinel returned for inputs that cannot be compared: mismatched
/// dimensions, an empty sequence, or lengths more than 3x apart.
pub const INVALID_DISTANCE: u32 = u32::MAX;

/// Length-normalised DTW distance between two feature sequences.
///
/// The per-cell cost spans [0, 2000] (the scaled cosine-distance range)
/// and the result is the mean cost along the optimal path, with the
/// seed cell counted twice. [`INVALID_DISTANCE`] flags incomparable
/// inputs. Lower is more similar; identical sequences yield 0.
pub fn distance<A, B>(a: &A, b: &B) -> u32
where
    A: SoundFeature + ?Sized,
    B: SoundFeature + ?Sized,
{
    let dimension = a.dim();
    if dimension != b.dim() {
        return INVALID_DISTANCE;
    }
    let (m, n) = (a.frames(), b.frames());
    if m == 0 || n == 0 {
        return INVALID_DISTANCE;
    }
    if m > 3 * n || n > 3 * m {
        return INVALID_DISTANCE;
    }

    let mut step_distances = vec![0u32; n];
    let mut step_counts = vec![0u32; n];

    // Self inner products of the columns are reused across every row.
    let inner_b: Vec<i64> = (0..n).map(|j| inner_product(b.row(j), b.row(j))).collect();

    // Base row: the (0,0) seed is counted twice, with a step count of
    // zero; the rest of the row accumulates leftward moves.
    let row_a = a.row(0);
    let inner_a = inner_product(row_a, row_a);
    step_distances[0] = 2 * cosine_distance(inner_product(row_a, b.row(0)), inner_a, inner_b[0]);
    step_counts[0] = 0;
    for j in 1..n {
        step_distances[j] = step_distances[j - 1]
            + cosine_distance(inner_product(row_a, b.row(j)), inner_a, inner_b[j]);
        step_counts[j] = j as u32;
    }

    for i in 1..m {
        let row_a = a.row(i);
        let inner_a = inner_product(row_a, row_a);

        // Column 0 only has the upward predecessor. The overwritten cell
        // is remembered as the next column's diagonal.
        let mut diag_distance = step_distances[0];
        let mut diag_count = step_counts[0];
        let mut prev_distance = diag_distance
            + cosine_distance(inner_product(row_a, b.row(0)), inner_a, inner_b[0]);
        let mut prev_count = diag_count + 1;
        step_distances[0] = prev_distance;
        step_counts[0] = prev_count;

        for j in 1..n {
            let up_distance = step_distances[j];
            let up_count = step_counts[j];

            // Smallest predecessor wins; ties prefer the diagonal, then
            // the upward move.
            let mut best_distance = diag_distance;
            let mut best_count = diag_count;
            if up_distance < best_distance {
                best_distance = up_distance;
                best_count = up_count;
            }
            if prev_distance < best_distance {
                best_distance = prev_distance;
                best_count = prev_count;
            }

            let cell_distance = best_distance
                + cosine_distance(inner_product(row_a, b.row(j)), inner_a, inner_b[j]);
            let cell_count = best_count + 1;

            diag_distance = up_distance;
            diag_count = up_count;
            step_distances[j] = cell_distance;
            step_counts[j] = cell_count;
            prev_distance = cell_distance;
            prev_count = cell_count;
        }
    }

    let total = step_distances[n - 1];
    let steps = step_counts[n - 1];
    if steps == 0 {
        // 1x1 comparison: the doubly-counted seed is the whole path.
        total / 2
    } else {
        total / steps
    }
}

fn inner_product(v1: &[i16], v2: &[i16]) -> i64 {
    v1.iter()
        .zip(v2)
        .map(|(&x, &y)| x as i64 * y as i64)
        .sum()
}

/// Cosine distance scaled to [0, 2000]. A zero-energy vector has no
/// direction; its similarity term is taken as zero, costing 1000.
fn cosine_distance(inner12: i64, inner1: i64, inner2: i64) -> u32 {
    let similarity = if inner1 == 0 || inner2 == 0 {
        0.0
    } else {
        inner12 as f32 / ((inner1 as f32) * (inner2 as f32)).sqrt()
    };
    (DISTANCE_SCALE * (1.0 - similarity)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfcc::MfccFeature;

    fn feature(frames: usize, dim: usize, fill: impl Fn(usize, usize) -> i16) -> MfccFeature {
        let values = (0..frames * dim)
            .map(|k| fill(k / dim, k % dim))
            .collect();
        MfccFeature::new(frames, dim, values).expect("valid dimensions")
    }

    #[test]
    fn identical_sequences_have_zero_distance() {
        let f = feature(10, 12, |_, j| 1000 + j as i16);
        assert_eq!(distance(&f, &f), 0);
    }

    #[test]
    fn single_frame_pair_avoids_division_by_zero() {
        let a = feature(1, 4, |_, j| (j as i16 + 1) * 100);
        assert_eq!(distance(&a, &a), 0);
    }

    #[test]
    fn dimension_mismatch_is_invalid() {
        let a = feature(4, 12, |_, _| 1);
        let b = feature(4, 13, |_, _| 1);
        assert_eq!(distance(&a, &b), INVALID_DISTANCE);
    }

    #[test]
    fn length_ratio_gate() {
        let one = feature(1, 12, |_, _| 1);
        let two = feature(2, 12, |_, _| 1);
        let three = feature(3, 12, |_, _| 1);
        let four = feature(4, 12, |_, _| 1);
        let six = feature(6, 12, |_, _| 1);

        // A 1:4 ratio exceeds the 3x gate in both directions.
        assert_eq!(distance(&one, &four), INVALID_DISTANCE);
        assert_eq!(distance(&four, &one), INVALID_DISTANCE);
        // 1:3 and 2:6 sit exactly on the gate and pass.
        assert_ne!(distance(&one, &three), INVALID_DISTANCE);
        assert_ne!(distance(&two, &six), INVALID_DISTANCE);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = feature(8, 4, |i, j| ((i * 37 + j * 11) % 200) as i16 - 100);
        let b = feature(10, 4, |i, j| ((i * 53 + j * 7) % 180) as i16 - 90);
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn opposed_vectors_cost_the_maximum() {
        // A 1x1 comparison returns the cell cost itself; anti-parallel
        // frames have cosine distance 2.0, scaled to 2000.
        let a = feature(1, 4, |_, _| 100);
        let b = feature(1, 4, |_, _| -100);
        assert_eq!(distance(&a, &b), 2000);
    }

    #[test]
    fn zero_energy_frames_cost_half_scale() {
        // A zero vector forces the similarity term to zero: cost 1000.
        let a = feature(1, 4, |_, _| 0);
        let b = feature(1, 4, |_, _| 100);
        assert_eq!(distance(&a, &b), 1000);
    }

    #[test]
    fn result_is_total_cost_over_step_count() {
        // Orthogonal frames cost exactly 1000 per cell. On a 3x3 lattice
        // the diagonal path totals 2000 (doubled seed) + 1000 + 1000 over
        // two steps.
        let a = feature(3, 2, |_, j| if j == 0 { 100 } else { 0 });
        let b = feature(3, 2, |_, j| if j == 1 { 100 } else { 0 });
        assert_eq!(distance(&a, &b), 2000);

        // On a 2x2 lattice of anti-parallel frames the path is the seed
        // (2 * 2000) plus one diagonal move: 6000 over a single step.
        let a = feature(2, 4, |_, _| 100);
        let b = feature(2, 4, |_, _| -100);
        assert_eq!(distance(&a, &b), 6000);
    }
}
