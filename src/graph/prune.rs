//! Retention-fraction pruning
//!
//! Bounds the model size by keeping only the cheapest share of each candidate
//! pool: edges competing within one group, or split/merge candidate nodes.

use log::trace;

/// Number of candidates kept from a pool of `pool` for a retention `fraction`.
///
/// Rounds half away from zero and never exceeds the pool.
pub fn retain_count(fraction: f64, pool: usize) -> usize {
    let kept = (fraction * pool as f64).round();
    if kept <= 0.0 {
        0
    } else {
        (kept as usize).min(pool)
    }
}

/// Number of edges a group keeps from a pool of competing destinations.
///
/// Like [`retain_count`], but a non-empty pool with a positive fraction keeps
/// at least its cheapest edge.
pub fn edge_retain_count(fraction: f64, pool: usize) -> usize {
    let kept = retain_count(fraction, pool);
    if kept == 0 && fraction > 0.0 && pool > 0 {
        1
    } else {
        kept
    }
}

/// Keeps the `keep` lowest-scored items.
///
/// Ranking is a stable sort on `score`, so ties go to the item enumerated
/// first. Survivors are returned in their original order.
pub fn retain_lowest<T, F>(items: Vec<T>, keep: usize, score: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    if keep >= items.len() {
        return items;
    }

    let mut ranked: Vec<usize> = (0..items.len()).collect();
    ranked.sort_by(|&a, &b| score(&items[a]).total_cmp(&score(&items[b])));

    let mut kept = vec![false; items.len()];
    for &index in ranked.iter().take(keep) {
        kept[index] = true;
    }

    trace!("pruning kept {keep} of {}", items.len());

    items
        .into_iter()
        .zip(kept)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

/// Prunes one edge group competing for `pool` candidate destinations.
///
/// The retained count depends on the pool rather than on the group's current
/// size, so pruning an already pruned group returns it unchanged.
pub fn prune_group<T, F>(group: Vec<T>, fraction: f64, pool: usize, cost: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    let keep = edge_retain_count(fraction, pool);
    retain_lowest(group, keep, cost)
}
