//! Allocation normalization.
//!
//! Keeps the outgoing percentages of one source node summing to 1:
//! - A lone allocation is forced to exactly 1.0.
//! - An all-zero set is split equally.
//! - A set already within [`NORMALIZATION_TOLERANCE`] of 1 is returned as is.
//! - Anything else is scaled by `1 / sum`.

use tbff_core::constants::NORMALIZATION_TOLERANCE;
use tbff_core::types::Allocation;

/// Normalize the outgoing allocations of a single source node.
///
/// Identities and endpoints are preserved; only `percentage` changes.
/// Callers pass one sibling set at a time, never allocations from
/// different sources.
pub fn normalize_allocations(allocations: &[Allocation]) -> Vec<Allocation> {
    match allocations {
        [] => Vec::new(),
        [only] => vec![Allocation {
            percentage: 1.0,
            ..only.clone()
        }],
        _ => {
            let total: f64 = allocations.iter().map(|a| a.percentage).sum();

            if total == 0.0 {
                let share = 1.0 / allocations.len() as f64;
                return with_percentages(allocations, |_| share);
            }

            if (total - 1.0).abs() < NORMALIZATION_TOLERANCE {
                return allocations.to_vec();
            }

            with_percentages(allocations, |p| p / total)
        }
    }
}

fn with_percentages(allocations: &[Allocation], f: impl Fn(f64) -> f64) -> Vec<Allocation> {
    allocations
        .iter()
        .map(|a| Allocation {
            percentage: f(a.percentage),
            ..a.clone()
        })
        .collect()
}
