//! Average line-number-weighted slice complexity: an optional per-function
//! diagnostic summarising how entangled a function's lines are overall.

use crate::middle_end::slice::{Slice, SliceOptions};

/// Each instruction line's baseline slice complexity, multiplied by its rank
/// among the sorted lines that have one, divided by the function's length
/// plus one.
pub fn avg_lineno_slice_complexity(slice: &Slice) -> f64 {
    let slice_map = slice.slice_map(&SliceOptions::baseline());
    let mut total: i64 = 0;
    for (rank, (_, result)) in slice_map.iter().enumerate() {
        total += result.complexity * rank as i64;
    }
    let func_length = slice_map.len() + 1;
    total as f64 / func_length as f64
}
