//! The block graph: `Instruction`, `Block`, `FunctionBlock`, `BlockList`.
//! Arena-of-labels style: blocks live in a flat map keyed by label inside a
//! `BlockList`, successor/predecessor edges are label-to-label, and a
//! per-`BlockList` counter mints fresh labels, so that two analyses running
//! side by side never collide.

use std::fmt;

use crate::commons::{Map, Set};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockLabel(pub u32);

impl fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstructionKind {
    FunctionHeader,
    Return,
    Raise,
    Pass,
    Break,
    Continue,
    For,
    While,
    Try,
    Except,
    Finally,
    Else,
    None,
}

/// One source line's worth of analysis-relevant facts.
///
/// Equality excludes `indentation`: two instructions that differ only in
/// indentation are the same instruction for condensation/structural-equality
/// purposes.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub line: usize,
    pub kind: InstructionKind,
    pub referenced: Set<String>,
    pub defined: Set<String>,
    pub control: Option<usize>,
    pub indentation: usize,
    pub multiline: Set<usize>,
}

impl Instruction {
    pub fn new(line: usize, kind: InstructionKind) -> Self {
        Instruction {
            line,
            kind,
            referenced: Set::new(),
            defined: Set::new(),
            control: None,
            indentation: 0,
            multiline: Set::new(),
        }
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
            && self.kind == other.kind
            && self.referenced == other.referenced
            && self.defined == other.defined
            && self.control == other.control
            && self.multiline == other.multiline
    }
}
impl Eq for Instruction {}

/// A basic block: an ordered line → instruction map plus successor and
/// predecessor label sets (ordered, so iteration order is deterministic and
/// the builder's "body then after" successor order survives into
/// condensation and slicing).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub label: BlockLabel,
    pub instructions: Map<usize, Instruction>,
    pub successors: Vec<BlockLabel>,
    pub predecessors: Vec<BlockLabel>,
}

impl Block {
    pub fn add_instruction(&mut self, instr: Instruction) {
        self.instructions.insert(instr.line, instr);
    }

    pub fn linenos(&self) -> Vec<usize> {
        self.instructions.keys().copied().collect()
    }

    /// Structural equality ignoring the block's own label, used by the
    /// condenser's "fold redundant branches" rewrite. Two blocks are equal
    /// when their instructions match and their successor sets are
    /// recursively equal relative to each other — callers pass a function
    /// that resolves labels to blocks and compares reachable structure.
    pub fn shallow_equals(&self, other: &Block) -> bool {
        self.instructions == other.instructions && self.successors.len() == other.successors.len()
    }
}

/// One top-level function or method's entry block plus its comment/blank
/// line bookkeeping. The entry block's label equals the function name; the
/// builder's header instruction lives here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionBlock {
    pub name: String,
    pub entry: BlockLabel,
    pub exit: BlockLabel,
    pub params: Vec<String>,
    pub blocks: Map<BlockLabel, Block>,
    pub blank_lines: Set<usize>,
    pub comments: Set<usize>,
}

impl FunctionBlock {
    pub fn unimportant(&self) -> Set<usize> {
        self.blank_lines.union(&self.comments).copied().collect()
    }

    pub fn get_block(&self, label: BlockLabel) -> &Block {
        self.blocks.get(&label).expect("dangling block label")
    }

    pub fn get_block_mut(&mut self, label: BlockLabel) -> &mut Block {
        self.blocks.get_mut(&label).expect("dangling block label")
    }

    /// All instructions across all blocks, sorted by line number.
    pub fn all_instructions(&self) -> Vec<&Instruction> {
        let mut out: Vec<&Instruction> = self.blocks.values().flat_map(|b| b.instructions.values()).collect();
        out.sort_by_key(|i| i.line);
        out
    }

    /// Maps each instruction line to the label of the block containing it.
    pub fn instr_block_map(&self) -> Map<usize, BlockLabel> {
        let mut map = Map::new();
        for block in self.blocks.values() {
            for line in block.instructions.keys() {
                map.insert(*line, block.label);
            }
        }
        map
    }

    /// Topological order starting from `entry`: every successor of a block
    /// is fully explored (recursively) before the block itself is placed, so
    /// a true sink (no outgoing edges, one predecessor) always lands last.
    /// Post-order DFS, each node prepended to the result after all of its
    /// successors have been visited — a plain DFS preorder would not
    /// guarantee that property, which the cyclomatic-complexity "last in
    /// topological order" rule below depends on.
    pub fn topo_order(&self) -> Vec<BlockLabel> {
        let mut visited = Set::new();
        let mut order = Vec::new();
        self.topo_order_visit(self.entry, &mut visited, &mut order);
        order
    }

    fn topo_order_visit(&self, label: BlockLabel, visited: &mut Set<BlockLabel>, order: &mut Vec<BlockLabel>) {
        if !visited.insert(label) {
            return;
        }
        let block = self.get_block(label);
        for succ in block.successors.iter().rev() {
            if !visited.contains(succ) {
                self.topo_order_visit(*succ, visited, order);
            }
        }
        order.insert(0, label);
    }

    /// Cyclomatic complexity: edges − nodes + 2 × exits, where an exit is a
    /// block with more than one predecessor or the last block in
    /// topological order.
    pub fn cyclomatic_complexity(&self) -> i64 {
        let order = self.topo_order();
        let nodes = order.len() as i64;
        let edges: i64 = order.iter().map(|l| self.get_block(*l).successors.len() as i64).sum();
        let last = order.last().copied();
        let exits = order
            .iter()
            .filter(|l| self.get_block(**l).predecessors.len() > 1 || Some(**l) == last)
            .count() as i64;
        edges - nodes + 2 * exits
    }
}

/// Mints fresh block labels for one top-level analysis (a `BlockList`). Not
/// a process-global counter: each `BlockList` owns one, so parallel analyses
/// over different functions never share state.
#[derive(Clone, Debug, Default)]
pub struct LabelCounter(u32);

impl LabelCounter {
    pub fn next(&mut self) -> BlockLabel {
        let label = BlockLabel(self.0);
        self.0 += 1;
        label
    }
}

/// One per top-level function or method found in the input.
#[derive(Clone, Debug, Default)]
pub struct BlockList {
    pub functions: Vec<FunctionBlock>,
}

