//! The query filter engine.
//!
//! Stateless and backend independent. The in-memory strategy and the
//! manager's fallback path both go through these two functions, which is what
//! keeps their results identical.

use crate::options::QueryOptions;

/// Filters and sorts a borrowed sequence, cloning the entities that pass.
///
/// The input slice is never modified. Relative order of passing entities is
/// preserved unless `sort_by` is set, in which case a stable sort is applied
/// (ties keep their filtered order).
pub fn select<T: Clone>(items: &[T], options: &QueryOptions<T>) -> Vec<T> {
    let mut selected: Vec<T> = items
        .iter()
        .filter(|entity| options.matches(entity))
        .cloned()
        .collect();
    sort(&mut selected, options);
    selected
}

/// Filters and sorts an owned sequence.
///
/// Same semantics as [`select`] without the clone.
pub fn select_owned<T>(items: Vec<T>, options: &QueryOptions<T>) -> Vec<T> {
    let mut selected: Vec<T> = items
        .into_iter()
        .filter(|entity| options.matches(entity))
        .collect();
    sort(&mut selected, options);
    selected
}

fn sort<T>(items: &mut [T], options: &QueryOptions<T>) {
    if let Some(compare) = &options.sort_by {
        // slice::sort_by is stable
        items.sort_by(|a, b| compare(a, b));
    }
}
