//! The slicer: backward static slicing driven by reaching definitions,
//! slice-CFG materialisation, and the `Slice` facade that bundles a
//! condensed function together with its analyses and caches.
//!
//! `CumulativeMinQueue` tracks a cumulative minimum across every line ever
//! enqueued, never recomputed from the queue's current contents; that exact
//! semantics is needed for the "controlling line above the slice so far"
//! rule below, which is why it isn't just a plain running minimum of the
//! queue's live contents.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::commons::{Map, Set};
use crate::middle_end::cfg::block::{Block, BlockLabel, FunctionBlock};
use crate::middle_end::condense::condense;
use crate::middle_end::dataflow::{analyze_live_vars, analyze_reaching_defs, LiveInfo, ReachingInfo};

struct CumulativeMinQueue {
    items: VecDeque<usize>,
    min: usize,
}

impl CumulativeMinQueue {
    fn new() -> Self {
        CumulativeMinQueue {
            items: VecDeque::new(),
            min: usize::MAX,
        }
    }

    fn enqueue(&mut self, item: usize) {
        if item < self.min {
            self.min = item;
        }
        self.items.push_back(item);
    }

    fn dequeue(&mut self) -> Option<usize> {
        self.items.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SliceOptions {
    pub include_control: bool,
    pub exclude_vars: Set<String>,
}

impl SliceOptions {
    pub fn baseline() -> Self {
        SliceOptions {
            include_control: true,
            exclude_vars: Set::new(),
        }
    }

    pub fn excluding(vars: impl IntoIterator<Item = String>) -> Self {
        SliceOptions {
            include_control: true,
            exclude_vars: vars.into_iter().collect(),
        }
    }
}

/// Backward static slice of `start_line` over `reaching`: every line
/// `start_line` transitively depends on.
pub fn slice_lines(func: &FunctionBlock, reaching: &ReachingInfo, start_line: usize, opts: &SliceOptions) -> Set<usize> {
    let instrs: Map<usize, &crate::middle_end::cfg::block::Instruction> =
        func.all_instructions().into_iter().map(|i| (i.line, i)).collect();

    let mut visited = Set::new();
    let mut queue = CumulativeMinQueue::new();
    queue.enqueue(start_line);

    while let Some(cur) = queue.dequeue() {
        if visited.contains(&cur) {
            continue;
        }
        if let (Some(instr_facts), Some(instr)) = (reaching.instructions.get(&cur), instrs.get(&cur)) {
            for var in &instr.referenced {
                if opts.exclude_vars.contains(var) {
                    continue;
                }
                if let Some(sites) = instr_facts.in_.get(var) {
                    for (_, def_line) in sites {
                        queue.enqueue(*def_line);
                    }
                }
            }
            for line in &instr.multiline {
                queue.enqueue(*line);
            }
            if let Some(control) = instr.control {
                if opts.include_control || control > queue.min {
                    queue.enqueue(control);
                }
            }
        }
        visited.insert(cur);
    }
    visited
}

/// Rebuilds a condensed function graph keeping only instructions whose
/// lines are in `lines`; blocks keep successor/predecessor links only to
/// other kept blocks. The source function's first block stays the entry;
/// every other surviving block gets a fresh label.
pub fn materialize(func: &FunctionBlock, lines: &Set<usize>) -> FunctionBlock {
    let order = func.topo_order();
    // Fresh labels for every non-entry block must not collide with any label
    // already in use (the entry block keeps its original label verbatim).
    let mut next_id = func.blocks.keys().map(|l| l.0).max().unwrap_or(0) + 1;
    let mut block_map: Map<BlockLabel, BlockLabel> = Map::new();
    let mut blocks: Map<BlockLabel, Block> = Map::new();
    let mut entry = None;

    for old_label in &order {
        let new_label = if block_map.is_empty() {
            func.entry
        } else {
            let label = BlockLabel(next_id);
            next_id += 1;
            label
        };
        block_map.insert(*old_label, new_label);
        if entry.is_none() {
            entry = Some(new_label);
        }
        let old_block = func.get_block(*old_label);
        let mut new_block = Block {
            label: new_label,
            ..Block::default()
        };
        for (line, instr) in &old_block.instructions {
            if lines.contains(line) {
                new_block.add_instruction(instr.clone());
            }
        }
        blocks.insert(new_label, new_block);
    }

    for old_label in &order {
        let new_label = block_map[old_label];
        let old_block = func.get_block(*old_label);
        for succ in &old_block.successors {
            if let Some(new_succ) = block_map.get(succ) {
                blocks.get_mut(&new_label).unwrap().successors.push(*new_succ);
            }
        }
        for pred in &old_block.predecessors {
            if let Some(new_pred) = block_map.get(pred) {
                blocks.get_mut(&new_label).unwrap().predecessors.push(*new_pred);
            }
        }
    }

    let exit = block_map.get(&func.exit).copied().unwrap_or(func.exit);
    let slice_func = FunctionBlock {
        name: func.name.clone(),
        entry: entry.unwrap_or(func.entry),
        exit,
        params: func.params.clone(),
        blocks,
        blank_lines: func.blank_lines.clone(),
        comments: func.comments.clone(),
    };
    condense(&slice_func)
}

#[derive(Clone, Debug)]
pub struct SliceResult {
    pub cfg: FunctionBlock,
    pub complexity: i64,
}

/// Bundles a condensed function with its analyses and slice caches. One
/// `Slice` is created per source function and deep-copies its input before
/// condensing, so the caller's `FunctionBlock` is never observably mutated.
pub struct Slice {
    pub func: FunctionBlock,
    pub reaching: ReachingInfo,
    pub live: LiveInfo,
    cache: RefCell<Map<Vec<usize>, SliceResult>>,
}

impl Slice {
    pub fn new(func: &FunctionBlock) -> Self {
        let condensed = condense(func);
        let reaching = analyze_reaching_defs(&condensed);
        let live = analyze_live_vars(&condensed);
        Slice {
            func: condensed,
            reaching,
            live,
            cache: RefCell::new(Map::new()),
        }
    }

    fn cache_key(lines: &Set<usize>) -> Vec<usize> {
        lines.iter().copied().collect()
    }

    /// Computes and memoises (by frozen line set) the materialised, condensed
    /// slice CFG and its cyclomatic complexity.
    pub fn get_slice(&self, lines: &Set<usize>) -> SliceResult {
        let key = Self::cache_key(lines);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }
        let cfg = materialize(&self.func, lines);
        let complexity = cfg.cyclomatic_complexity();
        let result = SliceResult { cfg, complexity };
        self.cache.borrow_mut().insert(key, result.clone());
        result
    }

    /// `line → slice_result` for every instruction-bearing line, given
    /// slicing options.
    pub fn slice_map(&self, opts: &SliceOptions) -> Map<usize, SliceResult> {
        let mut map = Map::new();
        for instr in self.func.all_instructions() {
            let lines = slice_lines(&self.func, &self.reaching, instr.line, opts);
            if !lines.is_empty() {
                map.insert(instr.line, self.get_slice(&lines));
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::{parse, scanner};
    use crate::middle_end::cfg::build;

    fn slice_first(src: &str) -> Slice {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        let func = list.functions.into_iter().next().unwrap();
        Slice::new(&func)
    }

    #[test]
    fn slice_of_return_includes_its_transitive_definitions() {
        let slice = slice_first("def f():\n    x = 1\n    y = x + 1\n    return y\n");
        let lines = slice_lines(&slice.func, &slice.reaching, 3, &SliceOptions::baseline());
        assert!(lines.contains(&1));
        assert!(lines.contains(&2));
    }

    #[test]
    fn excluding_a_variable_drops_its_definition_from_the_slice() {
        let slice = slice_first("def f():\n    x = 1\n    y = 2\n    return x\n");
        let opts = SliceOptions::excluding(["y".to_string()]);
        let lines = slice_lines(&slice.func, &slice.reaching, 3, &opts);
        assert!(!lines.contains(&2));
    }

    #[test]
    fn materialized_slice_complexity_is_memoised() {
        let slice = slice_first("def f(y):\n    if y < 4:\n        x = 1\n    return y\n");
        let lines: Set<usize> = [0usize, 1, 3].into_iter().map(|l| l + 1).collect();
        let first = slice.get_slice(&lines);
        let second = slice.get_slice(&lines);
        assert_eq!(first.complexity, second.complexity);
    }
}
