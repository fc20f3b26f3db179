//! The four range-generating heuristics: remove-variable, similar-reference,
//! diff-reference-livevar-block and diff-reference-livevar-instr. Each turns
//! a set of flagged lines into normalised `(min, max)` ranges.

use crate::commons::Set;
use crate::config::Config;
use crate::middle_end::cfg::block::FunctionBlock;
use crate::middle_end::slice::{Slice, SliceOptions};
use crate::middle_end::suggest::normalize::NormalizeContext;

/// Every single variable the function ever defines, plus, when `slow` is
/// set, every 3- and 4-variable consecutive-use group observed while
/// scanning the body.
pub fn variable_groups(func: &FunctionBlock, slow: bool) -> Vec<Vec<String>> {
    let mut universe: Set<String> = Set::new();
    for instr in func.all_instructions() {
        universe.extend(instr.defined.iter().cloned());
    }
    let mut groups: Vec<Vec<String>> = universe.iter().cloned().map(|v| vec![v]).collect();

    if slow {
        for size in [3usize, 4usize] {
            let mut seen: Set<Vec<String>> = Set::new();
            let mut window: Vec<String> = Vec::new();
            for instr in func.all_instructions() {
                let mut instr_vars: Vec<String> = instr.defined.iter().chain(instr.referenced.iter()).cloned().collect();
                instr_vars.sort();
                instr_vars.dedup();
                for var in instr_vars {
                    if !universe.contains(&var) {
                        continue;
                    }
                    window.push(var);
                    let mut frozen: Vec<String> = window.clone();
                    frozen.sort();
                    frozen.dedup();
                    if frozen.len() == size {
                        seen.insert(frozen);
                    }
                    if window.len() == size {
                        window.remove(0);
                    }
                }
            }
            groups.extend(seen);
        }
    }
    groups
}

/// H1 — RemoveVar: lines whose baseline-slice complexity exceeds their
/// variable-excluded reduced-slice complexity by at least
/// `min_diff_complexity_between_slices`.
pub fn remove_var(slice: &Slice, config: &Config, norm: &NormalizeContext, groups: &[Vec<String>]) -> Set<(usize, usize)> {
    let baseline = slice.slice_map(&SliceOptions::baseline());
    let mut suggestions = Set::new();

    for group in groups {
        let opts = SliceOptions::excluding(group.iter().cloned());
        let reduced = slice.slice_map(&opts);
        let mut linenos = Set::new();
        for (line, base_result) in &baseline {
            if let Some(reduced_result) = reduced.get(line) {
                let diff = base_result.complexity - reduced_result.complexity;
                if diff >= config.min_diff_complexity_between_slices {
                    linenos.insert(*line);
                }
            }
        }
        for (min_l, max_l) in norm.group_with_unimportant(&linenos) {
            if (max_l - min_l + 1) as i64 >= config.min_lines_in_suggestion {
                suggestions.insert((min_l, max_l));
            }
        }
    }
    suggestions
}

/// H2 — SimilarRef: consecutive instructions (in topological block order)
/// whose live-variable `referenced` set stays unchanged form one range.
pub fn similar_ref(slice: &Slice, config: &Config, norm: &NormalizeContext) -> Set<(usize, usize)> {
    let mut candidates = Set::new();
    let mut prev_ref: Set<String> = Set::new();
    let mut min_lineno: Option<usize> = None;
    let mut max_lineno: Option<usize> = None;

    for label in slice.func.topo_order() {
        let block = slice.func.get_block(label);
        for line in block.instructions.keys() {
            let referenced = slice.live.instructions.get(line).map(|f| f.referenced.clone()).unwrap_or_default();
            if referenced.is_empty() || referenced != prev_ref {
                if let (Some(mn), Some(mx)) = (min_lineno, max_lineno) {
                    if (mx - mn + 1) as i64 >= config.min_lines_in_suggestion {
                        candidates.insert((mn, mx));
                    }
                }
                min_lineno = Some(*line);
            }
            max_lineno = Some(*line);
            prev_ref = referenced;
        }
    }
    // The range still open when the walk ends is deliberately not closed
    // here — only a subsequent differing reference set closes a range.
    norm.split_groups_linenos(&candidates)
}

/// H3 — DiffRefLiveVarBlock: every instruction of a block whose
/// `|in| - |referenced|` meets the threshold.
pub fn diff_ref_livevar_block(slice: &Slice, config: &Config, norm: &NormalizeContext) -> Set<(usize, usize)> {
    let mut linenos = Set::new();
    for (label, facts) in &slice.live.blocks {
        if facts.in_.len() as i64 - facts.referenced.len() as i64 >= config.min_diff_ref_and_live_var {
            linenos.extend(slice.func.get_block(*label).instructions.keys().copied());
        }
    }
    norm.group_with_unimportant(&linenos)
}

/// H4 — DiffRefLiveVarInstr: the same predicate at instruction granularity,
/// with an additional post-filter requiring the resulting range to contain
/// more than `min_linenos_diff_reference_livevar_instr` actual instruction
/// lines (excluding `unimportant`).
pub fn diff_ref_livevar_instr(slice: &Slice, config: &Config, norm: &NormalizeContext) -> Set<(usize, usize)> {
    let mut linenos = Set::new();
    for (line, facts) in &slice.live.instructions {
        if facts.in_.len() as i64 - facts.referenced.len() as i64 >= config.min_diff_ref_and_live_var {
            linenos.insert(*line);
        }
    }
    let grouped = norm.group_with_unimportant(&linenos);
    let unimportant = slice.func.unimportant();

    let mut out = Set::new();
    for (min_l, max_l) in grouped {
        let range: Set<usize> = (min_l..=max_l).collect();
        let num_linenos = range.difference(&unimportant).count() as i64;
        if num_linenos > config.min_linenos_diff_reference_livevar_instr {
            out.insert((min_l, max_l));
        }
    }
    out
}
