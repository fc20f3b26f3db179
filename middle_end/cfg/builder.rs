//! Walks a validated AST and produces a `BlockList`.
//!
//! A closed-enum `match` over `Stmt`/`Expr` rather than a visitor method per
//! AST node kind, with per-`BlockList` label counters rather than a
//! process-global one. A `Builder` state struct carries cursor/loop-stack/
//! control state across a recursive walk of statement lists.

use crate::commons::{Map, Set};
use crate::error::{DecomposerError, Result};
use crate::front_end::ast::{ExceptHandler, Expr, ExprCtx, Program, Stmt};
use crate::front_end::scanner::ScanResult;
use crate::middle_end::cfg::block::{
    Block, BlockLabel, BlockList, FunctionBlock, Instruction, InstructionKind, LabelCounter,
};

const LIST_MUTATORS: &[&str] = &["append", "insert", "extend", "pop"];

pub fn build(program: &Program, scan: &ScanResult) -> Result<BlockList> {
    let mut functions = Vec::new();
    for function in &program.functions {
        functions.push(build_function(function, scan)?);
    }
    Ok(BlockList { functions })
}

fn build_function(function: &crate::front_end::ast::Function, scan: &ScanResult) -> Result<FunctionBlock> {
    let mut counter = LabelCounter::default();
    let entry = counter.next();
    let exit = counter.next();

    let mut blocks = Map::new();
    blocks.insert(entry, Block::default());
    blocks.insert(exit, Block::default());

    let mut func = FunctionBlock {
        name: function.name.clone(),
        entry,
        exit,
        params: function.params.clone(),
        blocks,
        blank_lines: Set::new(),
        comments: Set::new(),
    };
    func.get_block_mut(entry).label = entry;
    func.get_block_mut(exit).label = exit;

    let mut header = Instruction::new(function.line, InstructionKind::FunctionHeader);
    header.defined = function.params.iter().cloned().collect();
    func.get_block_mut(entry).add_instruction(header);

    let mut builder = Builder {
        scan,
        counter,
        loop_stack: Vec::new(),
        current_control: None,
        last_line: function.line,
    };
    let end = builder.walk_stmts(&function.body, &mut func, Some(entry))?;
    if let Some(cur) = end {
        link(&mut func, cur, exit);
    }

    let last_line = builder.last_line;
    classify_unimportant(function.line, last_line, scan, &mut func);
    Ok(func)
}

struct Builder<'a> {
    scan: &'a ScanResult,
    counter: LabelCounter,
    loop_stack: Vec<(BlockLabel, BlockLabel)>,
    current_control: Option<usize>,
    last_line: usize,
}

fn link(func: &mut FunctionBlock, from: BlockLabel, to: BlockLabel) {
    if from == to {
        return;
    }
    if !func.get_block(from).successors.contains(&to) {
        func.get_block_mut(from).successors.push(to);
    }
    if !func.get_block(to).predecessors.contains(&from) {
        func.get_block_mut(to).predecessors.push(from);
    }
}

fn new_block(func: &mut FunctionBlock, counter: &mut LabelCounter) -> BlockLabel {
    let label = counter.next();
    let mut block = Block::default();
    block.label = label;
    func.blocks.insert(label, block);
    label
}

impl<'a> Builder<'a> {
    /// Walks a statement list starting at `cursor`, returning the label of
    /// the block execution ends in, or `None` if every path through this
    /// list terminated (return/raise/break/continue).
    fn walk_stmts(
        &mut self,
        stmts: &[Stmt],
        func: &mut FunctionBlock,
        cursor: Option<BlockLabel>,
    ) -> Result<Option<BlockLabel>> {
        let mut cur = cursor;
        for stmt in stmts {
            let Some(block) = cur else {
                // dead code after a terminal statement; intentionally dropped.
                break;
            };
            cur = self.walk_stmt(stmt, func, block)?;
        }
        Ok(cur)
    }

    fn add_instruction(&mut self, func: &mut FunctionBlock, block: BlockLabel, mut instr: Instruction) {
        if let Some(control) = self.current_control {
            instr.control = Some(control);
        }
        if let Some(group) = self.scan.multiline.get(&instr.line) {
            instr.multiline = group.clone();
        }
        instr.indentation = *self.scan.line_indent.get(&instr.line).unwrap_or(&0);
        self.last_line = self.last_line.max(instr.line);
        func.get_block_mut(block).add_instruction(instr);
    }

    fn walk_stmt(
        &mut self,
        stmt: &Stmt,
        func: &mut FunctionBlock,
        cursor: BlockLabel,
    ) -> Result<Option<BlockLabel>> {
        match stmt {
            Stmt::FunctionDef { line, .. } => Err(DecomposerError::NestedFunctionRejected(*line)),

            Stmt::Assign { line, targets, value } => {
                let mut defined = Set::new();
                let mut referenced = collect_refs(value);
                for target in targets {
                    let (d, r) = target_defs_refs(target);
                    defined.extend(d);
                    referenced.extend(r);
                }
                let mut instr = Instruction::new(*line, InstructionKind::None);
                instr.defined = defined;
                instr.referenced = referenced;
                self.add_instruction(func, cursor, instr);
                Ok(Some(cursor))
            }

            Stmt::AugAssign { line, target, value } => {
                let (defined, mut referenced) = target_defs_refs(target);
                if let Some(name) = base_name(target) {
                    referenced.insert(name);
                }
                referenced.extend(collect_refs(value));
                let mut instr = Instruction::new(*line, InstructionKind::None);
                instr.defined = defined;
                instr.referenced = referenced;
                self.add_instruction(func, cursor, instr);
                Ok(Some(cursor))
            }

            Stmt::ExprStmt { line, value } => {
                let mut instr = Instruction::new(*line, InstructionKind::None);
                if let Expr::Call { func: callee, args, .. } = value {
                    if let Expr::Attribute { value: base, attr, .. } = callee.as_ref() {
                        if LIST_MUTATORS.contains(&attr.as_str()) {
                            if let Some(name) = base_name(base) {
                                instr.defined.insert(name.clone());
                                instr.referenced.insert(name);
                            }
                            for arg in args {
                                instr.referenced.extend(collect_refs(arg));
                            }
                            self.add_instruction(func, cursor, instr);
                            return Ok(Some(cursor));
                        }
                    }
                }
                instr.referenced = collect_refs(value);
                self.add_instruction(func, cursor, instr);
                Ok(Some(cursor))
            }

            Stmt::Return { line, value } => {
                let mut instr = Instruction::new(*line, InstructionKind::Return);
                if let Some(v) = value {
                    instr.referenced = collect_refs(v);
                }
                self.add_instruction(func, cursor, instr);
                link(func, cursor, func.exit);
                Ok(None)
            }

            Stmt::Raise { line, value } => {
                let mut instr = Instruction::new(*line, InstructionKind::Raise);
                if let Some(v) = value {
                    instr.referenced = collect_refs(v);
                }
                self.add_instruction(func, cursor, instr);
                link(func, cursor, func.exit);
                Ok(None)
            }

            Stmt::Pass { line } => {
                self.add_instruction(func, cursor, Instruction::new(*line, InstructionKind::Pass));
                Ok(Some(cursor))
            }

            Stmt::Break { line } => {
                self.add_instruction(func, cursor, Instruction::new(*line, InstructionKind::Break));
                if let Some((_, after)) = self.loop_stack.last().copied() {
                    link(func, cursor, after);
                }
                Ok(None)
            }

            Stmt::Continue { line } => {
                self.add_instruction(func, cursor, Instruction::new(*line, InstructionKind::Continue));
                if let Some((guard, _)) = self.loop_stack.last().copied() {
                    link(func, cursor, guard);
                }
                Ok(None)
            }

            Stmt::If {
                line,
                test,
                body,
                orelse,
                orelse_is_elif,
            } => self.walk_if(*line, test, body, orelse, *orelse_is_elif, func, cursor),

            Stmt::For {
                line,
                target,
                iter,
                body,
            } => self.walk_loop(*line, InstructionKind::For, Some(target), iter, body, func, cursor),

            Stmt::While { line, test, body } => {
                self.walk_loop(*line, InstructionKind::While, None, test, body, func, cursor)
            }

            Stmt::Try {
                line,
                body,
                handlers,
                finalbody,
            } => self.walk_try(*line, body, handlers, finalbody, func, cursor),
        }
    }

    fn walk_if(
        &mut self,
        line: usize,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        orelse_is_elif: bool,
        func: &mut FunctionBlock,
        cursor: BlockLabel,
    ) -> Result<Option<BlockLabel>> {
        let prev_control = self.current_control;

        let mut test_instr = Instruction::new(line, InstructionKind::None);
        test_instr.referenced = collect_refs(test);
        self.add_instruction(func, cursor, test_instr);
        self.current_control = Some(line);

        let if_body = new_block(func, &mut self.counter);
        link(func, cursor, if_body);
        let end_if = self.walk_stmts(body, func, Some(if_body))?;

        let end_else = if !orelse.is_empty() {
            let else_body = new_block(func, &mut self.counter);
            link(func, cursor, else_body);
            if !orelse_is_elif {
                let else_line = synthetic_line_before(orelse[0].line(), self.scan);
                self.add_instruction(func, else_body, Instruction::new(else_line, InstructionKind::Else));
                self.current_control = Some(else_line);
            } else {
                self.current_control = Some(line);
            }
            self.walk_stmts(orelse, func, Some(else_body))?
        } else {
            Some(cursor)
        };

        self.current_control = prev_control;

        match (end_if, end_else) {
            (None, None) => Ok(None),
            (end_if, end_else) => {
                let after = new_block(func, &mut self.counter);
                if let Some(b) = end_if {
                    link(func, b, after);
                }
                if let Some(b) = end_else {
                    link(func, b, after);
                }
                Ok(Some(after))
            }
        }
    }

    fn walk_loop(
        &mut self,
        line: usize,
        kind: InstructionKind,
        target: Option<&Expr>,
        iter_or_test: &Expr,
        body: &[Stmt],
        func: &mut FunctionBlock,
        cursor: BlockLabel,
    ) -> Result<Option<BlockLabel>> {
        let prev_control = self.current_control;

        let guard = new_block(func, &mut self.counter);
        link(func, cursor, guard);

        let mut guard_instr = Instruction::new(line, kind);
        if let Some(t) = target {
            let (defined, _) = target_defs_refs(t);
            guard_instr.defined = defined;
        }
        guard_instr.referenced = collect_refs(iter_or_test);
        self.add_instruction(func, guard, guard_instr);
        self.current_control = Some(line);

        let loop_body = new_block(func, &mut self.counter);
        let after = new_block(func, &mut self.counter);
        link(func, guard, loop_body);
        link(func, guard, after);

        self.loop_stack.push((guard, after));
        let body_end = self.walk_stmts(body, func, Some(loop_body))?;
        self.loop_stack.pop();
        if let Some(b) = body_end {
            link(func, b, guard);
        }

        self.current_control = prev_control;
        Ok(Some(after))
    }

    fn walk_try(
        &mut self,
        line: usize,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        finalbody: &[Stmt],
        func: &mut FunctionBlock,
        cursor: BlockLabel,
    ) -> Result<Option<BlockLabel>> {
        let prev_control = self.current_control;

        self.add_instruction(func, cursor, Instruction::new(line, InstructionKind::Try));
        self.current_control = Some(line);

        let try_body = new_block(func, &mut self.counter);
        link(func, cursor, try_body);
        let mut ends = vec![self.walk_stmts(body, func, Some(try_body))?];

        for handler in handlers {
            let handler_body = new_block(func, &mut self.counter);
            link(func, cursor, handler_body);

            let mut instr = Instruction::new(handler.line, InstructionKind::Except);
            if let Some(name) = &handler.bound_name {
                instr.defined.insert(name.clone());
            }
            self.add_instruction(func, handler_body, instr);
            self.current_control = Some(handler.line);

            ends.push(self.walk_stmts(&handler.body, func, Some(handler_body))?);
        }

        self.current_control = prev_control;

        let survivors: Vec<BlockLabel> = ends.into_iter().flatten().collect();
        let mut cur = if survivors.is_empty() {
            None
        } else {
            let after = new_block(func, &mut self.counter);
            for b in &survivors {
                link(func, *b, after);
            }
            Some(after)
        };

        if !finalbody.is_empty() {
            if let Some(after) = cur {
                let finally_line = synthetic_line_before(finalbody[0].line(), self.scan);
                self.add_instruction(func, after, Instruction::new(finally_line, InstructionKind::Finally));
                self.current_control = Some(finally_line);
                cur = self.walk_stmts(finalbody, func, Some(after))?;
                self.current_control = prev_control;
            }
        }

        Ok(cur)
    }
}

/// Walks backward from `line - 1` over comment/blank lines to find the
/// source line an `Else`/`Finally` placeholder instruction should sit on.
fn synthetic_line_before(line: usize, scan: &ScanResult) -> usize {
    let mut lineno = line.saturating_sub(1).max(1);
    while scan.comments.contains(&lineno) || scan.blank_lines.contains(&lineno) {
        if lineno == 1 {
            break;
        }
        lineno -= 1;
    }
    lineno
}

fn classify_unimportant(start: usize, end: usize, scan: &ScanResult, func: &mut FunctionBlock) {
    for line in start..=end {
        if scan.blank_lines.contains(&line) {
            func.blank_lines.insert(line);
        } else if scan.comments.contains(&line) {
            func.comments.insert(line);
        }
    }
}

fn base_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name { id, .. } => Some(id.clone()),
        Expr::Attribute { value, .. } => base_name(value),
        Expr::Subscript { value, .. } => base_name(value),
        _ => None,
    }
}

/// Defined/referenced contribution of an assignment target expression.
fn target_defs_refs(target: &Expr) -> (Set<String>, Set<String>) {
    match target {
        Expr::Name { id, .. } => {
            let mut d = Set::new();
            d.insert(id.clone());
            (d, Set::new())
        }
        Expr::Attribute { value, .. } => {
            let mut r = Set::new();
            if let Some(name) = base_name(value) {
                r.insert(name);
            } else {
                r.extend(collect_refs(value));
            }
            (Set::new(), r)
        }
        Expr::Subscript { value, index, .. } => {
            let mut d = Set::new();
            if let Some(name) = base_name(value) {
                d.insert(name);
            }
            let r = collect_refs(index);
            (d, r)
        }
        Expr::Tuple { items, .. } => {
            let mut d = Set::new();
            let mut r = Set::new();
            for item in items {
                let (id, ir) = target_defs_refs(item);
                d.extend(id);
                r.extend(ir);
            }
            (d, r)
        }
        _ => (Set::new(), Set::new()),
    }
}

/// Collects every variable read (Load-context) by `expr`. Attribute and
/// subscript bases contribute only their root name, not every intermediate
/// access.
fn collect_refs(expr: &Expr) -> Set<String> {
    let mut out = Set::new();
    collect_refs_into(expr, &mut out);
    out
}

fn collect_refs_into(expr: &Expr, out: &mut Set<String>) {
    match expr {
        Expr::Name { id, ctx: ExprCtx::Load, .. } => {
            out.insert(id.clone());
        }
        Expr::Name { ctx: ExprCtx::Store, .. } => {}
        Expr::Literal { .. } => {}
        Expr::Attribute { value, ctx: ExprCtx::Load, .. } => {
            if let Some(name) = base_name(value) {
                out.insert(name);
            } else {
                collect_refs_into(value, out);
            }
        }
        Expr::Attribute { ctx: ExprCtx::Store, .. } => {}
        Expr::Subscript {
            value,
            index,
            ctx: ExprCtx::Load,
            ..
        } => {
            if let Some(name) = base_name(value) {
                out.insert(name);
            } else {
                collect_refs_into(value, out);
            }
            collect_refs_into(index, out);
        }
        Expr::Subscript { ctx: ExprCtx::Store, .. } => {}
        Expr::Call { func, args, .. } => {
            collect_refs_into(func, out);
            for arg in args {
                collect_refs_into(arg, out);
            }
        }
        Expr::BinOp { left, right, .. } => {
            collect_refs_into(left, out);
            collect_refs_into(right, out);
        }
        Expr::UnaryOp { operand, .. } => collect_refs_into(operand, out),
        Expr::Tuple { items, .. } => {
            for item in items {
                collect_refs_into(item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::{parse, scanner};

    fn build_first_function(src: &str) -> FunctionBlock {
        let program = parse(src).unwrap();
        let scan = scanner::scan(src, false);
        let list = build(&program, &scan).unwrap();
        list.functions.into_iter().next().unwrap()
    }

    #[test]
    fn single_exit_for_straight_line_function() {
        let func = build_first_function("def f():\n    x = 1\n    return x\n");
        assert_eq!(func.get_block(func.exit).instructions.len(), 0);
        assert!(func.get_block(func.exit).predecessors.len() >= 1);
    }

    #[test]
    fn if_without_else_merges_at_after_block() {
        let func = build_first_function("def f(y):\n    x = 5\n    if y < 4:\n        return y\n    return x\n");
        // both the if-body (dead, returns) and the fallthrough reach exit.
        assert!(func.get_block(func.exit).predecessors.len() == 2);
    }

    #[test]
    fn break_links_to_after_block_not_guard() {
        let func = build_first_function("def f():\n    while True:\n        break\n    return 0\n");
        let guard = func.entry; // entry -> guard is first successor
        let guard_label = func.get_block(guard).successors[0];
        let guard_block = func.get_block(guard_label);
        assert_eq!(guard_block.successors.len(), 2);
    }

    #[test]
    fn symmetric_successor_predecessor_links() {
        let func = build_first_function(
            "def f(a):\n    if a < 5:\n        a = 5\n    else:\n        a = 0\n    return a\n",
        );
        for block in func.blocks.values() {
            for succ in &block.successors {
                assert!(func.get_block(*succ).predecessors.contains(&block.label));
            }
            for pred in &block.predecessors {
                assert!(func.get_block(*pred).successors.contains(&block.label));
            }
        }
    }
}
