//! Reaching-definitions analysis, forward and union-confluent.
//!
//! Operates on statement-level def/use sets rather than one variable at a
//! time, so the transfer functions below are built from the block/
//! instruction semantics directly.

use crate::commons::{Map, Set};
use crate::middle_end::cfg::{BlockLabel, FunctionBlock};
use crate::middle_end::dataflow::framework::{iterate_to_fixpoint, FunctionBlockInformation};

/// A definition site: the block and line on which a variable is assigned.
pub type DefSite = (BlockLabel, usize);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReachingFacts {
    pub gen: Map<String, Set<DefSite>>,
    pub kill: Map<String, Set<DefSite>>,
    pub in_: Map<String, Set<DefSite>>,
    pub out: Map<String, Set<DefSite>>,
}

pub type ReachingInfo = FunctionBlockInformation<ReachingFacts>;

/// Every `(block, line)` pair that ever defines each variable in the
/// function, shared by both analyses.
pub fn func_gen(func: &FunctionBlock) -> Map<String, Set<DefSite>> {
    let mut gen: Map<String, Set<DefSite>> = Map::new();
    for block in func.blocks.values() {
        for instr in block.instructions.values() {
            for var in &instr.defined {
                gen.entry(var.clone()).or_default().insert((block.label, instr.line));
            }
        }
    }
    gen
}

fn union_maps(a: &Map<String, Set<DefSite>>, b: &Map<String, Set<DefSite>>) -> Map<String, Set<DefSite>> {
    let mut out = a.clone();
    for (k, v) in b {
        out.entry(k.clone()).or_default().extend(v.iter().copied());
    }
    out
}

fn minus_maps(a: &Map<String, Set<DefSite>>, b: &Map<String, Set<DefSite>>) -> Map<String, Set<DefSite>> {
    let mut out = Map::new();
    for (k, v) in a {
        let removed: Set<DefSite> = match b.get(k) {
            Some(bv) => v.difference(bv).copied().collect(),
            None => v.clone(),
        };
        if !removed.is_empty() {
            out.insert(k.clone(), removed);
        }
    }
    out
}

fn instr_gen(defined: &Set<String>, block: BlockLabel, line: usize) -> Map<String, Set<DefSite>> {
    defined
        .iter()
        .map(|v| (v.clone(), Set::from_iter([(block, line)])))
        .collect()
}

fn instr_kill(gen: &Map<String, Set<DefSite>>, func_gen: &Map<String, Set<DefSite>>) -> Map<String, Set<DefSite>> {
    minus_maps(
        &gen.keys().filter_map(|k| func_gen.get(k).map(|v| (k.clone(), v.clone()))).collect(),
        gen,
    )
}

/// The block-level `gen`: the *last* definition of each variable in the
/// block.
fn block_gen(func: &FunctionBlock, label: BlockLabel) -> Map<String, Set<DefSite>> {
    let block = func.get_block(label);
    let mut last: Map<String, DefSite> = Map::new();
    for instr in block.instructions.values() {
        for var in &instr.defined {
            last.insert(var.clone(), (label, instr.line));
        }
    }
    last.into_iter().map(|(k, site)| (k, Set::from_iter([site]))).collect()
}

pub fn analyze(func: &FunctionBlock) -> ReachingInfo {
    let func_gen_map = func_gen(func);
    let labels: Vec<BlockLabel> = func.topo_order();

    let mut block_gens = Map::new();
    let mut block_kills = Map::new();
    for label in &labels {
        let gen = block_gen(func, *label);
        let kill = instr_kill(&gen, &func_gen_map);
        block_gens.insert(*label, gen);
        block_kills.insert(*label, kill);
    }

    let initial: Map<BlockLabel, (Map<String, Set<DefSite>>, Map<String, Set<DefSite>>)> =
        labels.iter().map(|l| (*l, (Map::new(), Map::new()))).collect();

    let fixed = iterate_to_fixpoint(initial, |prev| {
        let mut next = prev.clone();
        for label in &labels {
            let block = func.get_block(*label);
            let mut in_ = Map::new();
            for pred in &block.predecessors {
                if let Some((_, out)) = prev.get(pred) {
                    in_ = union_maps(&in_, out);
                }
            }
            let out = union_maps(block_gens.get(label).unwrap(), &minus_maps(&in_, block_kills.get(label).unwrap()));
            next.insert(*label, (in_, out));
        }
        next
    });

    let mut info = ReachingInfo::new();
    for label in &labels {
        let (in_, out) = fixed.get(label).cloned().unwrap_or_default();
        let gen = block_gens.get(label).cloned().unwrap_or_default();
        let kill = block_kills.get(label).cloned().unwrap_or_default();
        info.blocks.insert(
            *label,
            ReachingFacts {
                gen,
                kill,
                in_: in_.clone(),
                out: out.clone(),
            },
        );

        let block = func.get_block(*label);
        let mut running = in_;
        for instr in block.instructions.values() {
            let instr_in = running.clone();
            let gen = instr_gen(&instr.defined, *label, instr.line);
            let kill = instr_kill(&gen, &func_gen_map);
            running = union_maps(&gen, &minus_maps(&instr_in, &kill));
            info.instructions.insert(
                instr.line,
                ReachingFacts {
                    gen,
                    kill,
                    in_: instr_in,
                    out: running.clone(),
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

    fn analyze_first(src: &str) -> (FunctionBlock, ReachingInfo) {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        let func = list.functions.into_iter().next().unwrap();
        let info = analyze(&func);
        (func, info)
    }

    #[test]
    fn definition_reaches_subsequent_use() {
        let (func, info) = analyze_first("def f():\n    x = 1\n    y = x + 1\n    return y\n");
        let use_line = 3;
        let facts = info.instructions.get(&use_line).unwrap();
        assert!(facts.in_.contains_key("x"));
        let _ = func;
    }

    #[test]
    fn redefinition_kills_earlier_site() {
        let (_, info) = analyze_first("def f():\n    x = 1\n    x = 2\n    return x\n");
        let facts = info.instructions.get(&3).unwrap();
        let sites = &facts.out["x"];
        assert_eq!(sites.len(), 1);
        assert!(sites.iter().all(|(_, line)| *line == 2));
    }
}
