//! Admissible push-count estimate.
//!
//! Every box needs at least its Manhattan distance to whichever target it
//! ends on, and no two boxes share a target, so the cheapest perfect matching
//! between boxes and targets never overestimates the remaining pushes.

use crate::position::Position;

/// Cost of the cheapest perfect matching between `boxes` and `targets`
/// under Manhattan distance (Hungarian method, O(n³)).
///
/// Extra entries on the longer side stay unmatched.
pub fn lower_bound(boxes: &[Position], targets: &[Position]) -> u32 {
    let (rows, cols) = if boxes.len() <= targets.len() {
        (boxes, targets)
    } else {
        (targets, boxes)
    };
    let n = rows.len();
    let m = cols.len();
    if n == 0 {
        return 0;
    }

    let cost = |i: usize, j: usize| rows[i - 1].manhattan(cols[j - 1]) as i64;

    // potentials and matching are 1-based; column 0 is the virtual start
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; m + 1];
    let mut matched = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        matched[0] = i;
        let mut j0 = 0;
        let mut min_v = vec![i64::MAX; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = matched[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0, j) - u[i0] - v[j];
                if reduced < min_v[j] {
                    min_v[j] = reduced;
                    way[j] = j0;
                }
                if min_v[j] < delta {
                    delta = min_v[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[matched[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_v[j] -= delta;
                }
            }
            j0 = j1;
            if matched[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            matched[j0] = matched[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| matched[j] != 0)
        .map(|j| cost(matched[j], j) as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(row: i16, col: i16) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(lower_bound(&[], &[]), 0);
        assert_eq!(lower_bound(&[p(1, 1)], &[p(3, 4)]), 5);
    }

    #[test]
    fn beats_greedy_assignment() {
        // nearest-first takes (0,2)->(0,3) and leaves (0,4)->(0,0): 1 + 4
        let boxes = [p(0, 2), p(0, 4)];
        let goals = [p(0, 3), p(0, 0)];
        assert_eq!(lower_bound(&boxes, &goals), 2 + 1);

        let boxes = [p(0, 0), p(0, 3)];
        let goals = [p(0, 4), p(0, 1)];
        assert_eq!(lower_bound(&boxes, &goals), 2);
    }

    #[test]
    fn boxes_on_targets_cost_nothing() {
        let cells = [p(1, 1), p(2, 5), p(4, 3)];
        assert_eq!(lower_bound(&cells, &cells), 0);
    }

    fn brute_force(boxes: &[Position], targets: &[Position]) -> u32 {
        fn go(i: usize, boxes: &[Position], targets: &[Position], used: &mut Vec<bool>) -> u32 {
            if i == boxes.len() {
                return 0;
            }
            let mut best = u32::MAX;
            for j in 0..targets.len() {
                if !used[j] {
                    used[j] = true;
                    let rest = go(i + 1, boxes, targets, used);
                    used[j] = false;
                    best = best.min(rest + boxes[i].manhattan(targets[j]));
                }
            }
            best
        }
        go(0, boxes, targets, &mut vec![false; targets.len()])
    }

    proptest! {
        #[test]
        fn matches_exhaustive_assignment(
            cells in prop::collection::vec((0i16..12, 0i16..12), 2..=12)
        ) {
            let half = cells.len() / 2;
            let boxes: Vec<Position> = cells[..half].iter().map(|&(r, c)| p(r, c)).collect();
            let targets: Vec<Position> = cells[half..half * 2].iter().map(|&(r, c)| p(r, c)).collect();
            prop_assert_eq!(lower_bound(&boxes, &targets), brute_force(&boxes, &targets));
        }
    }
}
