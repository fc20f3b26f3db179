//! A small style linter: cosmetic suggestions the CLI prints under
//! `--debug`, entirely outside the decomposition engine's contracts. Only
//! line-length and undescriptive-identifier checks are expressed here; an
//! `else`-clause check would need `for`/`while`/`try` `orelse` data this
//! grammar doesn't carry.

use crate::commons::Map;
use crate::front_end::ast::{Expr, Function, Program, Stmt};

const LINE_LENGTH_LIMIT: usize = 80;

/// Per-line cosmetic messages, keyed by line number, in the shape the CLI
/// prints them.
pub fn lint(source: &str, program: &Program) -> Map<usize, Vec<String>> {
    let mut suggestions: Map<usize, Vec<String>> = Map::new();
    check_line_length(source, &mut suggestions);
    for function in &program.functions {
        check_descriptive_names(function, &mut suggestions);
    }
    suggestions
}

fn add(suggestions: &mut Map<usize, Vec<String>>, lineno: usize, message: String) {
    let entry = suggestions.entry(lineno).or_default();
    if !entry.contains(&message) {
        entry.push(message);
    }
}

fn check_line_length(source: &str, suggestions: &mut Map<usize, Vec<String>>) {
    let message = format!("Line length over {LINE_LENGTH_LIMIT} characters.");
    for (lineno, line) in source.lines().enumerate() {
        if line.len() > LINE_LENGTH_LIMIT {
            add(suggestions, lineno + 1, message.clone());
        }
    }
}

/// Flags identifiers made up of a single repeated character (`x`, `xx`,
/// `ii`, ...), the original's `_handle_identifier` rule.
fn check_descriptive_names(function: &Function, suggestions: &mut Map<usize, Vec<String>>) {
    for param in &function.params {
        flag_if_undescriptive(param, function, suggestions);
    }
    for stmt in &function.body {
        walk_stmt(stmt, function, suggestions);
    }
}

fn flag_if_undescriptive(identifier: &str, function: &Function, suggestions: &mut Map<usize, Vec<String>>) {
    let distinct: std::collections::BTreeSet<char> = identifier.chars().collect();
    if distinct.len() <= 1 {
        add(
            suggestions,
            function.line,
            format!("Use descriptive variable name instead of '{identifier}' in '{}'.", function.name),
        );
    }
}

fn walk_stmt(stmt: &Stmt, function: &Function, suggestions: &mut Map<usize, Vec<String>>) {
    match stmt {
        Stmt::Assign { targets, value, .. } => {
            for target in targets {
                walk_expr(target, function, suggestions);
            }
            walk_expr(value, function, suggestions);
        }
        Stmt::AugAssign { target, value, .. } => {
            walk_expr(target, function, suggestions);
            walk_expr(value, function, suggestions);
        }
        Stmt::ExprStmt { value, .. } => walk_expr(value, function, suggestions),
        Stmt::Return { value, .. } | Stmt::Raise { value, .. } => {
            if let Some(value) = value {
                walk_expr(value, function, suggestions);
            }
        }
        Stmt::If { test, body, orelse, .. } => {
            walk_expr(test, function, suggestions);
            for s in body.iter().chain(orelse) {
                walk_stmt(s, function, suggestions);
            }
        }
        Stmt::For { target, iter, body, .. } => {
            walk_expr(target, function, suggestions);
            walk_expr(iter, function, suggestions);
            for s in body {
                walk_stmt(s, function, suggestions);
            }
        }
        Stmt::While { test, body, .. } => {
            walk_expr(test, function, suggestions);
            for s in body {
                walk_stmt(s, function, suggestions);
            }
        }
        Stmt::Try { body, handlers, finalbody, .. } => {
            for s in body.iter().chain(finalbody) {
                walk_stmt(s, function, suggestions);
            }
            for handler in handlers {
                for s in &handler.body {
                    walk_stmt(s, function, suggestions);
                }
            }
        }
        Stmt::Pass { .. } | Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::FunctionDef { .. } => {}
    }
}

fn walk_expr(expr: &Expr, function: &Function, suggestions: &mut Map<usize, Vec<String>>) {
    match expr {
        Expr::Name { id, .. } => flag_if_undescriptive(id, function, suggestions),
        Expr::Literal { .. } => {}
        Expr::Attribute { value, .. } => walk_expr(value, function, suggestions),
        Expr::Subscript { value, index, .. } => {
            walk_expr(value, function, suggestions);
            walk_expr(index, function, suggestions);
        }
        Expr::Call { func, args, .. } => {
            walk_expr(func, function, suggestions);
            for arg in args {
                walk_expr(arg, function, suggestions);
            }
        }
        Expr::BinOp { left, right, .. } => {
            walk_expr(left, function, suggestions);
            walk_expr(right, function, suggestions);
        }
        Expr::UnaryOp { operand, .. } => walk_expr(operand, function, suggestions),
        Expr::Tuple { items, .. } => {
            for item in items {
                walk_expr(item, function, suggestions);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::parse;

    #[test]
    fn flags_single_character_identifiers() {
        let source = "def f(x):\n    return x\n";
        let program = parse(source).unwrap();
        let suggestions = lint(source, &program);
        assert!(suggestions.contains_key(&1));
    }

    #[test]
    fn flags_overlong_lines() {
        let long_line = "x".repeat(90);
        let source = format!("def f():\n    return \"{long_line}\"\n");
        let program = parse(&source).unwrap();
        let suggestions = lint(&source, &program);
        assert!(suggestions.get(&2).map(|m| !m.is_empty()).unwrap_or(false));
    }
}
