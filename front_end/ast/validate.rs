//! Validates a parsed `Program` before it reaches the CFG builder.
//!
//! The one structural rule the core depends on: no function definition may
//! be nested inside another function's body. Everything else
//! about shape (identifiers, well-formed calls) is the parser's job, not
//! validation's, keeping parsing and validation as separate passes trimmed
//! down to the one check this core actually needs.

use crate::commons::Valid;
use crate::error::{DecomposerError, Result};
use crate::front_end::ast::{Program, Stmt};

pub fn validate(program: Program) -> Result<Valid<Program>> {
    for function in &program.functions {
        check_no_nested_functions(&function.body)?;
    }
    Ok(Valid::assume_valid(program))
}

fn check_no_nested_functions(body: &[Stmt]) -> Result<()> {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef { line, .. } => {
                return Err(DecomposerError::NestedFunctionRejected(*line));
            }
            Stmt::If { body, orelse, .. } => {
                check_no_nested_functions(body)?;
                check_no_nested_functions(orelse)?;
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => {
                check_no_nested_functions(body)?;
            }
            Stmt::Try {
                body,
                handlers,
                finalbody,
                ..
            } => {
                check_no_nested_functions(body)?;
                for handler in handlers {
                    check_no_nested_functions(&handler.body)?;
                }
                check_no_nested_functions(finalbody)?;
            }
            Stmt::Assign { .. }
            | Stmt::AugAssign { .. }
            | Stmt::ExprStmt { .. }
            | Stmt::Return { .. }
            | Stmt::Raise { .. }
            | Stmt::Pass { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::ast::{Expr, ExprCtx, Function};

    fn name(line: usize, id: &str) -> Expr {
        Expr::Name {
            line,
            id: id.to_string(),
            ctx: ExprCtx::Load,
        }
    }

    #[test]
    fn accepts_flat_function() {
        let program = Program {
            functions: vec![Function {
                name: "f".to_string(),
                line: 1,
                params: vec![],
                body: vec![Stmt::Return {
                    line: 2,
                    value: Some(name(2, "x")),
                }],
            }],
        };
        assert!(validate(program).is_ok());
    }

    #[test]
    fn rejects_nested_def() {
        let program = Program {
            functions: vec![Function {
                name: "f".to_string(),
                line: 1,
                params: vec![],
                body: vec![Stmt::FunctionDef {
                    line: 2,
                    name: "g".to_string(),
                }],
            }],
        };
        assert_eq!(
            validate(program).unwrap_err(),
            DecomposerError::NestedFunctionRejected(2)
        );
    }

    #[test]
    fn rejects_def_nested_inside_if() {
        let program = Program {
            functions: vec![Function {
                name: "f".to_string(),
                line: 1,
                params: vec![],
                body: vec![Stmt::If {
                    line: 2,
                    test: name(2, "cond"),
                    body: vec![Stmt::FunctionDef {
                        line: 3,
                        name: "g".to_string(),
                    }],
                    orelse: vec![],
                    orelse_is_elif: false,
                }],
            }],
        };
        assert_eq!(
            validate(program).unwrap_err(),
            DecomposerError::NestedFunctionRejected(3)
        );
    }
}
