//! The condenser: repeatedly applies four CFG rewrites to a `FunctionBlock`
//! until a fixed point, used by the slicer to normalize a materialised slice
//! before computing its cyclomatic complexity.
//!
//! A DFS over the reachable blocks applies, per visited block,
//! fold-redundant-branch, remove-empty-block, combine-linear-chain and
//! hoist-branch-past-empty-block in that order, repeated until the whole
//! graph stops changing. Each rewrite mutates `successors`/`predecessors`
//! label vectors directly through a pair of `link`/`unlink` helpers that keep
//! both ends symmetric, and every pass ends by dropping blocks no longer
//! reachable from the entry.

use crate::commons::Set;
use crate::middle_end::cfg::block::{BlockLabel, FunctionBlock};

pub fn condense(func: &FunctionBlock) -> FunctionBlock {
    let mut current = func.clone();
    loop {
        let next = condense_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// One full DFS sweep applying all four rewrites, mirroring
/// `_condense_cfg_helper`'s single worklist pass.
fn condense_pass(func: &FunctionBlock) -> FunctionBlock {
    let mut working = func.clone();
    let mut visited = Set::new();
    let mut stack = vec![working.entry];
    while let Some(label) = stack.pop() {
        if !visited.insert(label) {
            continue;
        }
        if !working.blocks.contains_key(&label) {
            continue;
        }
        fold_redundant_branches(&mut working, label);
        remove_empty_block(&mut working, label);
        combine_linear_chain(&mut working, label);
        hoist_branch_past_empty_block(&mut working, label);

        if let Some(block) = working.blocks.get(&label) {
            for succ in block.successors.iter().rev() {
                if !visited.contains(succ) {
                    stack.push(*succ);
                }
            }
        }
    }
    prune_unreachable(&mut working);
    working
}

fn unlink(func: &mut FunctionBlock, from: BlockLabel, to: BlockLabel) {
    if let Some(block) = func.blocks.get_mut(&from) {
        block.successors.retain(|s| *s != to);
    }
    if let Some(block) = func.blocks.get_mut(&to) {
        block.predecessors.retain(|p| *p != from);
    }
}

fn relink(func: &mut FunctionBlock, from: BlockLabel, to: BlockLabel) {
    if from == to {
        return;
    }
    if let Some(block) = func.blocks.get_mut(&from) {
        if !block.successors.contains(&to) {
            block.successors.push(to);
        }
    }
    if let Some(block) = func.blocks.get_mut(&to) {
        if !block.predecessors.contains(&from) {
            block.predecessors.push(from);
        }
    }
}

/// Fully detaches `label` from every predecessor and successor, the way
/// `BlockInterface.destroy` does.
fn destroy_block(func: &mut FunctionBlock, label: BlockLabel) {
    let preds = func.get_block(label).predecessors.clone();
    let succs = func.get_block(label).successors.clone();
    for p in preds {
        unlink(func, p, label);
    }
    for s in succs {
        unlink(func, label, s);
    }
}

/// Structural equality of the subgraphs reachable from `a` and `b`, ignoring
/// labels: same instructions, then
/// recursively equal successors pairwise. A `visiting` memo treats any pair
/// revisited mid-comparison as equal, which is the right call on a
/// reducible CFG with back-edges (loops) — without it, comparing two
/// looping branches would never terminate.
fn structurally_equal(func: &FunctionBlock, a: BlockLabel, b: BlockLabel, visiting: &mut Set<(BlockLabel, BlockLabel)>) -> bool {
    if a == b {
        return true;
    }
    let key = if a.0 <= b.0 { (a, b) } else { (b, a) };
    if !visiting.insert(key) {
        return true;
    }
    let ba = func.get_block(a);
    let bb = func.get_block(b);
    if ba.instructions != bb.instructions {
        return false;
    }
    if ba.successors.len() != bb.successors.len() {
        return false;
    }
    let sa = ba.successors.clone();
    let sb = bb.successors.clone();
    sa.iter().zip(sb.iter()).all(|(x, y)| structurally_equal(func, *x, *y, visiting))
}

/// 1. Fold redundant branches: if every successor of `label` is structurally
/// equal to the others, keep only the first.
fn fold_redundant_branches(func: &mut FunctionBlock, label: BlockLabel) {
    let succs = func.get_block(label).successors.clone();
    if succs.len() < 2 {
        return;
    }
    let mut visiting = Set::new();
    let all_equal = succs.windows(2).all(|w| structurally_equal(func, w[0], w[1], &mut visiting));
    if !all_equal {
        return;
    }
    for extra in &succs[1..] {
        destroy_block(func, *extra);
    }
    func.get_block_mut(label).successors.truncate(1);
}

/// 2. Remove empty block: if `label` is not the function entry, has exactly
/// one successor and carries no instructions, re-parent every predecessor to
/// the successor directly.
fn remove_empty_block(func: &mut FunctionBlock, label: BlockLabel) {
    if label == func.entry {
        return;
    }
    let block = func.get_block(label);
    if block.successors.len() != 1 || !block.instructions.is_empty() {
        return;
    }
    let target = block.successors[0];
    let preds = func.get_block(label).predecessors.clone();
    for p in preds {
        if p == label {
            continue;
        }
        unlink(func, p, label);
        relink(func, p, target);
    }
    unlink(func, label, target);
}

/// 3. Combine linear chain: if `label`'s sole successor has `label` as its
/// only predecessor, absorb the successor's instructions and rewire past it.
fn combine_linear_chain(func: &mut FunctionBlock, label: BlockLabel) {
    let block = func.get_block(label);
    if block.successors.len() != 1 {
        return;
    }
    let succ = block.successors[0];
    if succ == label || func.get_block(succ).predecessors.len() != 1 {
        return;
    }
    let grandchildren = func.get_block(succ).successors.clone();
    if grandchildren.contains(&label) {
        // Would introduce a self-loop; skip the rewrite entirely.
        return;
    }
    let moved = func.get_block(succ).instructions.clone();
    func.get_block_mut(label).instructions.extend(moved);
    unlink(func, label, succ);
    for g in grandchildren {
        unlink(func, succ, g);
        relink(func, label, g);
    }
}

/// 4. Hoist branch past empty block: if `label`'s sole successor is an empty
/// block with multiple successors of its own, skip straight to them.
fn hoist_branch_past_empty_block(func: &mut FunctionBlock, label: BlockLabel) {
    let block = func.get_block(label);
    if block.successors.len() != 1 {
        return;
    }
    let succ = block.successors[0];
    let succ_block = func.get_block(succ);
    if !succ_block.instructions.is_empty() || succ_block.successors.len() <= 1 {
        return;
    }
    let children = succ_block.successors.clone();
    if children.contains(&label) {
        // Would introduce a self-loop; skip the rewrite entirely.
        return;
    }
    unlink(func, label, succ);
    for c in children {
        relink(func, label, c);
    }
}

fn prune_unreachable(func: &mut FunctionBlock) {
    let mut reachable = Set::new();
    let mut stack = vec![func.entry];
    while let Some(label) = stack.pop() {
        if !reachable.insert(label) {
            continue;
        }
        if let Some(block) = func.blocks.get(&label) {
            for succ in &block.successors {
                stack.push(*succ);
            }
        }
    }
    func.blocks.retain(|label, _| reachable.contains(label));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::{parse, scanner};
    use crate::middle_end::cfg::build;

    fn build_first(src: &str) -> FunctionBlock {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        list.functions.into_iter().next().unwrap()
    }

    #[test]
    fn idempotent_at_fixed_point() {
        let func = build_first("def f(y):\n    x = 5\n    if y < 4:\n        return y\n    return x\n");
        let once = condense(&func);
        let twice = condense(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn merges_straight_line_blocks() {
        let func = build_first("def f():\n    x = 1\n    y = 2\n    return x + y\n");
        let condensed = condense(&func);
        // a straight-line function condenses to a single block holding every instruction.
        assert_eq!(condensed.blocks.len(), 1);
        assert_eq!(condensed.get_block(condensed.entry).instructions.len(), 3);
    }

    #[test]
    fn preserves_branch_with_distinct_bodies() {
        let func = build_first("def f(y):\n    if y < 4:\n        return y\n    return 1\n");
        let condensed = condense(&func);
        assert!(condensed.get_block(condensed.entry).successors.len() >= 2);
    }
}
