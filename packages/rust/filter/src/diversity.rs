//! Greedy diversity selection over scored candidates.

use std::collections::HashMap;

use leadscope_shared::{Category, ScoredUrl};

/// Selection knobs; see `[pipeline]` in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Maximum number of URLs selected.
    pub budget: usize,
    /// Maximum URLs per category before backfilling.
    pub per_category_cap: usize,
    /// Candidates scoring below this are only taken as backfill.
    pub min_score: u8,
}

/// Pick at most `budget` candidates, spreading them across categories.
///
/// `candidates` must be in discovery order, which breaks score ties. Pass one
/// walks candidates by descending score, taking those at or above `min_score`
/// while their category is under the cap. If that leaves the budget unfilled,
/// pass two backfills from the best remaining candidates regardless of
/// category or threshold. The result is ordered by descending score.
pub fn select_diverse(candidates: Vec<ScoredUrl>, policy: SelectionPolicy) -> Vec<ScoredUrl> {
    if policy.budget == 0 {
        return Vec::new();
    }

    let mut ranked = candidates;
    // Stable: equal scores keep discovery order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    let mut taken = vec![false; ranked.len()];
    let mut selected = 0usize;
    let mut per_category: HashMap<&Category, usize> = HashMap::new();

    for (idx, candidate) in ranked.iter().enumerate() {
        if selected >= policy.budget {
            break;
        }
        if candidate.score < policy.min_score {
            continue;
        }
        let count = per_category.entry(&candidate.category).or_insert(0);
        if *count >= policy.per_category_cap {
            continue;
        }
        *count += 1;
        taken[idx] = true;
        selected += 1;
    }

    for flag in taken.iter_mut() {
        if selected >= policy.budget {
            break;
        }
        if !*flag {
            *flag = true;
            selected += 1;
        }
    }

    ranked
        .into_iter()
        .zip(taken)
        .filter_map(|(candidate, keep)| keep.then_some(candidate))
        .collect()
}
