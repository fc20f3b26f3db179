//! The suggestion engine: combines the dataflow engine, the slicer and the
//! block graph to emit ranked decomposition suggestions for one function.

pub mod avg_complexity;
pub mod heuristics;
pub mod normalize;
pub mod project;
pub mod types;

use crate::commons::{Map, Set};
use crate::config::Config;
use crate::middle_end::cfg::block::FunctionBlock;
use crate::middle_end::slice::Slice;
use normalize::NormalizeContext;
use types::{Reason, Suggestion};

/// Runs all four heuristics, normalises and validates their ranges, and
/// returns the function's suggestions sorted ascending by start line (ties
/// broken by descending end line), plus the function's average
/// line-number-weighted slice complexity.
pub fn suggest(func: &FunctionBlock, config: &Config, slow: bool) -> (Vec<Suggestion>, f64) {
    let slice = Slice::new(func);
    let norm = NormalizeContext::new(&slice.func);
    let groups = heuristics::variable_groups(&slice.func, slow);

    let mut by_range: Map<(usize, usize), Set<Reason>> = Map::new();
    add(&mut by_range, heuristics::remove_var(&slice, config, &norm, &groups), Reason::RemoveVar);
    add(&mut by_range, heuristics::similar_ref(&slice, config, &norm), Reason::SimilarRef);
    add(&mut by_range, heuristics::diff_ref_livevar_block(&slice, config, &norm), Reason::DiffRefLiveVarBlock);
    add(&mut by_range, heuristics::diff_ref_livevar_instr(&slice, config, &norm), Reason::DiffRefLiveVarInstr);

    let mut suggestions = Vec::new();
    for ((min_l, max_l), reasons) in by_range {
        let parameters = project::parameters(&slice, min_l, max_l);
        let returns = project::returns(&slice, min_l, max_l);
        if project::is_valid(&slice, config, min_l, max_l, &parameters, &returns) {
            suggestions.push(Suggestion {
                function: slice.func.name.clone(),
                start_line: min_l,
                end_line: max_l,
                parameters,
                returns,
                reasons,
            });
        }
    }
    suggestions.sort();

    let complexity = avg_complexity::avg_lineno_slice_complexity(&slice);
    (suggestions, complexity)
}

fn add(by_range: &mut Map<(usize, usize), Set<Reason>>, ranges: Set<(usize, usize)>, reason: Reason) {
    for range in ranges {
        by_range.entry(range).or_default().insert(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::front_end::{parse, scanner};
    use crate::middle_end::cfg::build;

    fn suggest_first(src: &str, config: &Config, slow: bool) -> (Vec<Suggestion>, f64) {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        let func = list.functions.into_iter().next().unwrap();
        suggest(&func, config, slow)
    }

    #[test]
    fn trivial_function_yields_no_suggestions() {
        let config = Config::default();
        let (suggestions, _) = suggest_first("def f(x):\n    return x\n", &config, false);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn suggestions_are_sorted_by_start_then_descending_end() {
        let a = Suggestion {
            function: "f".into(),
            start_line: 2,
            end_line: 5,
            parameters: vec![],
            returns: vec![],
            reasons: Set::new(),
        };
        let b = Suggestion {
            function: "f".into(),
            start_line: 2,
            end_line: 8,
            parameters: vec![],
            returns: vec![],
            reasons: Set::new(),
        };
        let mut v = vec![a.clone(), b.clone()];
        v.sort();
        assert_eq!(v[0].end_line, 8);
        assert_eq!(v[1].end_line, 5);
    }
}
