//! Ordering Within Ranks
//!
//! Crossing reduction with the iterated barycenter heuristic. Each sweep
//! sorts a rank by the mean position of its neighbours in the adjacent rank.
//! Nodes without neighbours there keep their current slot as their key, and
//! ties fall back to the current order, so the result depends only on the
//! input order.

use super::{LayoutGraph, Neighbours};

/// Group nodes into ranks, keeping input order inside each rank.
pub(super) fn rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().copied().max().map_or(0, |max| max + 1);
    let mut buckets = vec![Vec::new(); depth];
    for (node, &rank) in ranks.iter().enumerate() {
        buckets[rank].push(node);
    }
    buckets
}

/// Reorder ranks in place to reduce edge crossings.
///
/// Stops after `max_passes` down/up sweeps or as soon as a pass does not
/// improve the crossing count. The best ordering seen is kept.
pub(super) fn minimize_crossings(
    buckets: &mut [Vec<usize>],
    ranks: &[usize],
    graph: &LayoutGraph,
    max_passes: usize,
) {
    if buckets.len() < 2 {
        return;
    }

    let mut slot = vec![0usize; graph.len()];
    refresh_slots(buckets, &mut slot);

    let mut best = buckets.to_vec();
    let mut best_crossings = total_crossings(buckets, graph, &slot);

    for _ in 0..max_passes {
        if best_crossings == 0 {
            break;
        }

        for rank in 1..buckets.len() {
            let adjacent = Adjacent { neighbours: &graph.pred, ranks, rank: rank - 1 };
            sweep(&mut buckets[rank], &adjacent, &mut slot);
        }
        for rank in (0..buckets.len() - 1).rev() {
            let adjacent = Adjacent { neighbours: &graph.succ, ranks, rank: rank + 1 };
            sweep(&mut buckets[rank], &adjacent, &mut slot);
        }

        let crossings = total_crossings(buckets, graph, &slot);
        if crossings < best_crossings {
            best_crossings = crossings;
            best.clone_from_slice(buckets);
        } else {
            break;
        }
    }

    buckets.clone_from_slice(&best);
}

fn refresh_slots(buckets: &[Vec<usize>], slot: &mut [usize]) {
    for bucket in buckets {
        for (index, &node) in bucket.iter().enumerate() {
            slot[node] = index;
        }
    }
}

/// Neighbour lists restricted to one adjacent rank.
struct Adjacent<'a> {
    neighbours: &'a [Neighbours],
    ranks: &'a [usize],
    rank: usize,
}

/// Sort one rank by the barycenter of each node's neighbours in the
/// adjacent rank.
fn sweep(bucket: &mut Vec<usize>, adjacent: &Adjacent<'_>, slot: &mut [usize]) {
    let mut keyed: Vec<(f64, usize, usize)> = bucket
        .iter()
        .map(|&node| {
            let (sum, count) = adjacent.neighbours[node]
                .iter()
                .filter(|&&other| adjacent.ranks[other] == adjacent.rank)
                .fold((0usize, 0usize), |(sum, count), &other| (sum + slot[other], count + 1));
            let key = if count == 0 {
                slot[node] as f64
            } else {
                sum as f64 / count as f64
            };
            (key, slot[node], node)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    bucket.clear();
    bucket.extend(keyed.into_iter().map(|(_, _, node)| node));
    for (index, &node) in bucket.iter().enumerate() {
        slot[node] = index;
    }
}

/// Count crossings between every pair of adjacent ranks.
fn total_crossings(buckets: &[Vec<usize>], graph: &LayoutGraph, slot: &[usize]) -> usize {
    buckets
        .windows(2)
        .map(|pair| crossings_between(&pair[0], &pair[1], graph, slot))
        .sum()
}

fn crossings_between(upper: &[usize], lower: &[usize], graph: &LayoutGraph, slot: &[usize]) -> usize {
    let mut in_lower = vec![false; graph.len()];
    for &node in lower {
        in_lower[node] = true;
    }

    // Edge endpoints as (upper slot, lower slot), sorted by upper slot;
    // crossings are then the inversions among the lower slots.
    let mut ends: Vec<(usize, usize)> = Vec::new();
    for &u in upper {
        for &v in graph.succ[u].iter().filter(|&&v| in_lower[v]) {
            ends.push((slot[u], slot[v]));
        }
    }
    ends.sort_unstable();

    let mut crossings = 0;
    for (i, &(ua, la)) in ends.iter().enumerate() {
        for &(ub, lb) in &ends[i + 1..] {
            if ua < ub && la > lb {
                crossings += 1;
            }
        }
    }
    crossings
}
