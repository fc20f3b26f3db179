//! Projects a surviving range to its parameters and return values, and the
//! final policy-threshold validation.

use std::collections::VecDeque;

use crate::commons::Set;
use crate::config::Config;
use crate::middle_end::cfg::block::{BlockLabel, InstructionKind};
use crate::middle_end::slice::Slice;

/// Variables referenced inside `[min, max]` that are read before any
/// in-range definition, in sorted order.
pub fn parameters(slice: &Slice, min: usize, max: usize) -> Vec<String> {
    let mut variables = Set::new();
    let mut defined = Set::new();
    for lineno in min..=max {
        if let Some(facts) = slice.live.instructions.get(&lineno) {
            for var in &facts.referenced {
                if !defined.contains(var) {
                    variables.insert(var.clone());
                }
            }
            defined.extend(facts.defined.iter().cloned());
        }
    }
    variables.into_iter().collect()
}

/// In-range defined variables, variables referenced by an in-range `Return`,
/// and the set of blocks whose out-of-range tail still needs scanning. The
/// range's own block stays in that set when the range ends mid-block, so its
/// own remaining (out-of-range) lines get scanned same as a true successor.
fn defined_variables(slice: &Slice, min: usize, max: usize) -> (Set<String>, Set<String>, Set<BlockLabel>) {
    let instr_block_map = slice.func.instr_block_map();
    let mut defined = Set::new();
    let mut variables = Set::new();
    let mut successors: Set<BlockLabel> = Set::new();

    for lineno in min..=max {
        let facts = match slice.live.instructions.get(&lineno) {
            Some(f) => f,
            None => continue,
        };
        defined.extend(facts.defined.iter().cloned());

        if let Some(&label) = instr_block_map.get(&lineno) {
            let block = slice.func.get_block(label);
            let block_last = block.instructions.keys().next_back().copied();
            if !defined.is_empty() {
                successors.insert(label);
            }
            if successors.contains(&label) && block_last == Some(lineno) {
                successors.remove(&label);
            }
            if !defined.is_empty() {
                successors.extend(block.successors.iter().copied());
            }
        }

        if let Some(&label) = instr_block_map.get(&lineno) {
            if let Some(instr) = slice.func.get_block(label).instructions.get(&lineno) {
                if instr.kind == InstructionKind::Return {
                    variables.extend(facts.referenced.iter().cloned());
                }
            }
        }
    }
    (defined, variables, successors)
}

/// In-range-defined variables still referenced (or redefined) outside the
/// range, found by breadth-first traversal of successor blocks, in sorted
/// order.
pub fn returns(slice: &Slice, min: usize, max: usize) -> Vec<String> {
    let (mut defined, mut variables, successors) = defined_variables(slice, min, max);
    let mut visited: Set<BlockLabel> = Set::new();
    let mut queue: VecDeque<BlockLabel> = successors.into_iter().collect();

    while let Some(label) = queue.pop_front() {
        if !visited.contains(&label) {
            let block = slice.func.get_block(label);
            for lineno in block.instructions.keys() {
                if let Some(facts) = slice.live.instructions.get(lineno) {
                    if *lineno < min || *lineno > max {
                        variables.extend(defined.intersection(&facts.referenced).cloned());
                        for var in &facts.defined {
                            defined.remove(var);
                        }
                    }
                }
            }
            for succ in &block.successors {
                queue.push_back(*succ);
            }
        }
        visited.insert(label);
    }
    variables.into_iter().collect()
}

/// A range becomes a `Suggestion` iff every one of the five policy
/// thresholds below holds.
pub fn is_valid(slice: &Slice, config: &Config, min: usize, max: usize, parameters: &[String], returns: &[String]) -> bool {
    let linenos: Set<usize> = (min..=max).collect();
    let unimportant = slice.func.unimportant();
    let linenos_instrs: Set<usize> = linenos.difference(&unimportant).copied().collect();
    let func_linenos: Set<usize> = slice.func.all_instructions().iter().map(|i| i.line).collect();
    let lines_func_not_in_suggestion = func_linenos.len() as i64 - linenos_instrs.len() as i64;

    let params_as_set: Set<String> = parameters.iter().cloned().collect();
    let func_params: Set<String> = slice.func.params.iter().cloned().collect();

    parameters.len() as i64 >= config.min_variables_parameter_in_suggestion
        && returns.len() as i64 <= config.max_variables_return_in_suggestion
        && linenos_instrs.len() as i64 >= config.min_lines_in_suggestion
        && lines_func_not_in_suggestion >= config.min_lines_func_not_in_suggestion
        && params_as_set != func_params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::{parse, scanner};
    use crate::middle_end::cfg::build;

    fn slice_of(src: &str) -> Slice {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        let func = list.functions.into_iter().next().unwrap();
        Slice::new(&func)
    }

    #[test]
    fn parameters_are_read_before_any_in_range_definition() {
        let slice = slice_of("def f(y):\n    x = y + 1\n    z = x + 1\n    return z\n");
        let params = parameters(&slice, 2, 3);
        assert_eq!(params, vec!["x".to_string()]);
    }

    #[test]
    fn returns_carries_in_range_definitions_used_after_the_range() {
        let slice = slice_of("def f():\n    x = 1\n    y = 2\n    return x + y\n");
        let rets = returns(&slice, 2, 3);
        assert_eq!(rets, vec!["x".to_string(), "y".to_string()]);
    }
}
