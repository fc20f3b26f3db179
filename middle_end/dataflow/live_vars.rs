//! Live-variables analysis, backward and union-confluent.
//!
//! A variable is live entering a block if it is referenced before being
//! redefined within the block (an upward-exposed use), or if it is live at
//! any successor and not killed by this block.

use crate::commons::Set;
use crate::middle_end::cfg::{BlockLabel, FunctionBlock};
use crate::middle_end::dataflow::framework::{iterate_to_fixpoint, FunctionBlockInformation};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveFacts {
    pub defined: Set<String>,
    pub referenced: Set<String>,
    pub in_: Set<String>,
    pub out: Set<String>,
}

pub type LiveInfo = FunctionBlockInformation<LiveFacts>;

/// Names defined anywhere in the function, restricting live-variable
/// tracking to the function's own locals/parameters (the same idea as
/// `reaching_defs::func_gen`, applied here to the backward direction).
fn func_defined(func: &FunctionBlock) -> Set<String> {
    let mut defined: Set<String> = func.params.iter().cloned().collect();
    for block in func.blocks.values() {
        for instr in block.instructions.values() {
            defined.extend(instr.defined.iter().cloned());
        }
    }
    defined
}

fn restrict(names: impl IntoIterator<Item = String>, universe: &Set<String>) -> Set<String> {
    names.into_iter().filter(|n| universe.contains(n)).collect()
}

pub fn analyze(func: &FunctionBlock) -> LiveInfo {
    let universe = func_defined(func);
    let order = func.topo_order();

    let mut block_defined = crate::commons::Map::new();
    let mut block_referenced = crate::commons::Map::new();
    for label in &order {
        let block = func.get_block(*label);
        let mut defined = Set::new();
        let mut referenced = Set::new();
        for instr in block.instructions.values() {
            let refs = restrict(instr.referenced.iter().cloned(), &universe);
            for r in refs {
                if !defined.contains(&r) {
                    referenced.insert(r);
                }
            }
            defined.extend(restrict(instr.defined.iter().cloned(), &universe));
        }
        block_defined.insert(*label, defined);
        block_referenced.insert(*label, referenced);
    }

    let initial: crate::commons::Map<BlockLabel, (Set<String>, Set<String>)> =
        order.iter().map(|l| (*l, (Set::new(), Set::new()))).collect();

    let fixed = iterate_to_fixpoint(initial, |prev| {
        let mut next = prev.clone();
        for label in &order {
            let block = func.get_block(*label);
            let mut out = Set::new();
            for succ in &block.successors {
                if let Some((in_, _)) = prev.get(succ) {
                    out.extend(in_.iter().cloned());
                }
            }
            let defined = block_defined.get(label).cloned().unwrap_or_default();
            let referenced = block_referenced.get(label).cloned().unwrap_or_default();
            let mut in_ = referenced.clone();
            in_.extend(out.difference(&defined).cloned());
            next.insert(*label, (in_, out));
        }
        next
    });

    let mut info = LiveInfo::new();
    for label in &order {
        let (in_, out) = fixed.get(label).cloned().unwrap_or_default();
        let defined = block_defined.get(label).cloned().unwrap_or_default();
        let referenced = block_referenced.get(label).cloned().unwrap_or_default();
        info.blocks.insert(
            *label,
            LiveFacts {
                defined: defined.clone(),
                referenced: referenced.clone(),
                in_: in_.clone(),
                out: out.clone(),
            },
        );

        let block = func.get_block(*label);
        let mut running = out;
        for instr in block.instructions.values().rev() {
            let instr_out = running.clone();
            let defined = restrict(instr.defined.iter().cloned(), &universe);
            let referenced = restrict(instr.referenced.iter().cloned(), &universe);
            running = referenced.clone();
            running.extend(instr_out.difference(&defined).cloned());
            info.instructions.insert(
                instr.line,
                LiveFacts {
                    defined,
                    referenced,
                    in_: running.clone(),
                    out: instr_out,
                },
            );
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::{parse, scanner};
    use crate::middle_end::cfg::build;

    fn analyze_first(src: &str) -> LiveInfo {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        let func = list.functions.into_iter().next().unwrap();
        analyze(&func)
    }

    #[test]
    fn variable_used_later_is_live_before_its_use() {
        let info = analyze_first("def f():\n    x = 1\n    y = 2\n    return x\n");
        let facts = info.instructions.get(&1).unwrap();
        assert!(facts.out.contains("x"));
        assert!(!facts.out.contains("y"));
    }

    #[test]
    fn redefinition_kills_the_earlier_value() {
        let info = analyze_first("def f():\n    x = 1\n    x = 2\n    return x\n");
        let first_def = info.instructions.get(&1).unwrap();
        assert!(!first_def.out.contains("x"));
        let second_def = info.instructions.get(&2).unwrap();
        assert!(second_def.out.contains("x"));
    }
}
