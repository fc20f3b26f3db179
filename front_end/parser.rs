// Recursive-descent parser for the Python-like subset described by the AST
// contract (front_end::ast). You are free to change any function or type
// signature except for `parse` and `ParseError`.

use derive_more::Display;

use crate::front_end::ast::{ExceptHandler, Expr, ExprCtx, Function, Program, Stmt};
use crate::front_end::lexer::{lex, Token, TokenKind, Word};

// SECTION: interface

pub fn parse(code: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(code);
    parser.program()
}

// A parse error with explanatory message.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct ParseError(pub String);
impl std::error::Error for ParseError {}

// SECTION: parser functionality

#[derive(Clone, Debug)]
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(code: &str) -> Self {
        Parser {
            tokens: lex(code),
            pos: 0,
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos.min(self.tokens.len() - 1)].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error_here(&self, msg: &str) -> ParseError {
        ParseError(format!("line {}: {}", self.peek_line(), msg))
    }

    fn is_word(&self, w: Word) -> bool {
        matches!(self.peek(), TokenKind::Word(k) if *k == w)
    }

    fn eat_word(&mut self, w: Word) -> bool {
        if self.is_word(w) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, w: Word) -> Result<usize, ParseError> {
        let line = self.peek_line();
        if self.eat_word(w) {
            Ok(line)
        } else {
            Err(self.error_here(&format!("expected {w:?}")))
        }
    }

    fn eat_kind(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat_kind(&kind) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {kind:?}")))
        }
    }

    fn ident(&mut self) -> Result<(String, usize), ParseError> {
        let line = self.peek_line();
        match self.peek().clone() {
            TokenKind::Word(Word::Ident(name)) => {
                self.advance();
                Ok((name, line))
            }
            _ => Err(self.error_here("expected identifier")),
        }
    }

    // SECTION: grammar

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut functions = Vec::new();
        while !matches!(self.peek(), TokenKind::Eof) {
            functions.push(self.function_def()?);
        }
        Ok(Program { functions })
    }

    fn function_def(&mut self) -> Result<Function, ParseError> {
        let line = self.expect_word(Word::Def)?;
        let (name, _) = self.ident()?;
        self.expect_kind(TokenKind::Word(Word::LParen))?;
        let mut params = Vec::new();
        if !self.is_word(Word::RParen) {
            loop {
                let (p, _) = self.ident()?;
                params.push(p);
                if !self.eat_kind(&TokenKind::Word(Word::Comma)) {
                    break;
                }
            }
        }
        self.expect_kind(TokenKind::Word(Word::RParen))?;
        let body = self.block()?;
        Ok(Function {
            name,
            line,
            params,
            body,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_kind(TokenKind::Word(Word::Colon))?;
        self.expect_kind(TokenKind::Newline)?;
        self.expect_kind(TokenKind::Indent)?;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), TokenKind::Dedent | TokenKind::Eof) {
            stmts.push(self.stmt()?);
        }
        self.eat_kind(&TokenKind::Dedent);
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.is_word(Word::Def) {
            let line = self.peek_line();
            let inner = self.function_def()?;
            return Ok(Stmt::FunctionDef {
                line,
                name: inner.name,
            });
        }
        if self.is_word(Word::If) {
            return self.if_stmt(Word::If);
        }
        if self.is_word(Word::For) {
            return self.for_stmt();
        }
        if self.is_word(Word::While) {
            return self.while_stmt();
        }
        if self.is_word(Word::Try) {
            return self.try_stmt();
        }
        self.simple_stmt()
    }

    fn if_stmt(&mut self, keyword: Word) -> Result<Stmt, ParseError> {
        let line = self.expect_word(keyword)?;
        let test = self.expr()?;
        let body = self.block()?;
        let (orelse, orelse_is_elif) = if self.is_word(Word::Elif) {
            (vec![self.if_stmt(Word::Elif)?], true)
        } else if self.eat_word(Word::Else) {
            (self.block()?, false)
        } else {
            (Vec::new(), false)
        };
        Ok(Stmt::If {
            line,
            test,
            body,
            orelse,
            orelse_is_elif,
        })
    }

    fn for_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.expect_word(Word::For)?;
        let (name, tline) = self.ident()?;
        let target = Expr::Name {
            line: tline,
            id: name,
            ctx: ExprCtx::Store,
        };
        self.expect_word(Word::In)?;
        let iter = self.expr()?;
        let body = self.block()?;
        Ok(Stmt::For {
            line,
            target,
            iter,
            body,
        })
    }

    fn while_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.expect_word(Word::While)?;
        let test = self.expr()?;
        let body = self.block()?;
        Ok(Stmt::While { line, test, body })
    }

    fn try_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.expect_word(Word::Try)?;
        let body = self.block()?;
        let mut handlers = Vec::new();
        while self.is_word(Word::Except) {
            let hline = self.expect_word(Word::Except)?;
            if !self.is_word(Word::Colon) {
                let _ = self.ident()?; // exception type name, unused by the core
            }
            let bound_name = if self.eat_word(Word::As) {
                Some(self.ident()?.0)
            } else {
                None
            };
            let hbody = self.block()?;
            handlers.push(ExceptHandler {
                line: hline,
                bound_name,
                body: hbody,
            });
        }
        let finalbody = if self.eat_word(Word::Finally) {
            self.block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::Try {
            line,
            body,
            handlers,
            finalbody,
        })
    }

    fn simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let line = self.peek_line();
        let stmt = if self.eat_word(Word::Return) {
            let value = if matches!(self.peek(), TokenKind::Newline) {
                None
            } else {
                Some(self.expr()?)
            };
            Stmt::Return { line, value }
        } else if self.eat_word(Word::Raise) {
            let value = if matches!(self.peek(), TokenKind::Newline) {
                None
            } else {
                Some(self.expr()?)
            };
            Stmt::Raise { line, value }
        } else if self.eat_word(Word::Pass) {
            Stmt::Pass { line }
        } else if self.eat_word(Word::Break) {
            Stmt::Break { line }
        } else if self.eat_word(Word::Continue) {
            Stmt::Continue { line }
        } else {
            self.expr_or_assign_stmt(line)?
        };
        self.expect_kind(TokenKind::Newline)?;
        Ok(stmt)
    }

    fn expr_or_assign_stmt(&mut self, line: usize) -> Result<Stmt, ParseError> {
        let first = self.expr()?;
        if matches!(
            self.peek(),
            TokenKind::Word(Word::PlusEq | Word::MinusEq | Word::StarEq | Word::SlashEq)
        ) {
            self.advance();
            let value = self.expr()?;
            return Ok(Stmt::AugAssign {
                line,
                target: to_store(first),
                value,
            });
        }
        if self.eat_kind(&TokenKind::Word(Word::Eq)) {
            let mut chain = vec![first];
            loop {
                let next = self.expr()?;
                if self.eat_kind(&TokenKind::Word(Word::Eq)) {
                    chain.push(next);
                } else {
                    let value = next;
                    let targets = chain.into_iter().map(to_store).collect();
                    return Ok(Stmt::Assign {
                        line,
                        targets,
                        value,
                    });
                }
            }
        }
        Ok(Stmt::ExprStmt { line, value: first })
    }

    // SECTION: expressions, lowest to highest precedence

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while self.eat_bool_op() {
            let line = left.line();
            let right = self.and_expr()?;
            left = Expr::BinOp {
                line,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not_expr()?;
        while self.eat_bool_op() {
            let line = left.line();
            let right = self.not_expr()?;
            left = Expr::BinOp {
                line,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Consumes a trailing `and`/`or` token. The lexer doesn't distinguish
    /// them from `not` by variant, only by source text, but at this point in
    /// the grammar a leading `not` is never valid, so any `BoolOp` token here
    /// is one of the two infix forms.
    fn eat_bool_op(&mut self) -> bool {
        if matches!(self.peek(), TokenKind::Word(Word::BoolOp)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), TokenKind::Word(Word::BoolOp)) {
            let line = self.peek_line();
            self.advance();
            let operand = self.not_expr()?;
            return Ok(Expr::UnaryOp {
                line,
                operand: Box::new(operand),
            });
        }
        self.compare_expr()
    }

    fn compare_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.arith_expr()?;
        if matches!(self.peek(), TokenKind::Word(Word::Compare)) {
            let line = left.line();
            self.advance();
            let right = self.arith_expr()?;
            return Ok(Expr::BinOp {
                line,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn arith_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.postfix()?;
        while matches!(self.peek(), TokenKind::Word(Word::Arith)) {
            let line = left.line();
            self.advance();
            let right = self.postfix()?;
            left = Expr::BinOp {
                line,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut base = self.atom()?;
        loop {
            if self.eat_kind(&TokenKind::Word(Word::Dot)) {
                let line = base.line();
                let (attr, _) = self.ident()?;
                base = Expr::Attribute {
                    line,
                    value: Box::new(base),
                    attr,
                    ctx: ExprCtx::Load,
                };
            } else if self.eat_kind(&TokenKind::Word(Word::LParen)) {
                let line = base.line();
                let mut args = Vec::new();
                if !self.is_word(Word::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if !self.eat_kind(&TokenKind::Word(Word::Comma)) {
                            break;
                        }
                    }
                }
                self.expect_kind(TokenKind::Word(Word::RParen))?;
                base = Expr::Call {
                    line,
                    func: Box::new(base),
                    args,
                };
            } else if self.eat_kind(&TokenKind::Word(Word::LBracket)) {
                let line = base.line();
                let index = self.expr()?;
                self.expect_kind(TokenKind::Word(Word::RBracket))?;
                base = Expr::Subscript {
                    line,
                    value: Box::new(base),
                    index: Box::new(index),
                    ctx: ExprCtx::Load,
                };
            } else {
                break;
            }
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let line = self.peek_line();
        match self.peek().clone() {
            TokenKind::Word(Word::Ident(name)) => {
                self.advance();
                Ok(Expr::Name {
                    line,
                    id: name,
                    ctx: ExprCtx::Load,
                })
            }
            TokenKind::Word(Word::Number(_)) | TokenKind::Word(Word::Str(_)) => {
                self.advance();
                Ok(Expr::Literal { line })
            }
            TokenKind::Word(Word::Arith) => {
                // unary minus
                self.advance();
                let operand = self.postfix()?;
                Ok(Expr::UnaryOp {
                    line,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Word(Word::LParen) => {
                self.advance();
                let mut items = vec![self.expr()?];
                let mut is_tuple = false;
                while self.eat_kind(&TokenKind::Word(Word::Comma)) {
                    is_tuple = true;
                    if self.is_word(Word::RParen) {
                        break;
                    }
                    items.push(self.expr()?);
                }
                self.expect_kind(TokenKind::Word(Word::RParen))?;
                if is_tuple {
                    Ok(Expr::Tuple { line, items })
                } else {
                    Ok(items.into_iter().next().unwrap())
                }
            }
            other => Err(self.error_here(&format!("unexpected token {other:?}"))),
        }
    }
}

/// Flips the load/store context of a top-level assignment target. Only the
/// outermost node changes context: in `obj.attr = v` the `obj` sub-expression
/// is still read (Load) to find the container, only the attribute access
/// itself is a Store.
fn to_store(expr: Expr) -> Expr {
    match expr {
        Expr::Name { line, id, .. } => Expr::Name {
            line,
            id,
            ctx: ExprCtx::Store,
        },
        Expr::Attribute {
            line, value, attr, ..
        } => Expr::Attribute {
            line,
            value,
            attr,
            ctx: ExprCtx::Store,
        },
        Expr::Subscript {
            line, value, index, ..
        } => Expr::Subscript {
            line,
            value,
            index,
            ctx: ExprCtx::Store,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_function() {
        let src = "def f():\n    x = 5\n    return x\n";
        let program = parse(src).unwrap();
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name, "f");
        assert_eq!(program.functions[0].body.len(), 2);
    }

    #[test]
    fn parses_if_elif_else() {
        let src = "def f(y):\n    if y < 4:\n        return y\n    elif y < 8:\n        return 1\n    else:\n        return 0\n";
        let program = parse(src).unwrap();
        match &program.functions[0].body[0] {
            Stmt::If {
                orelse,
                orelse_is_elif,
                ..
            } => {
                assert!(*orelse_is_elif);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn parses_chained_assignment() {
        let src = "def f():\n    i = 3\n    i = j = i + 1\n    return j\n";
        let program = parse(src).unwrap();
        match &program.functions[0].body[1] {
            Stmt::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn parses_try_except_finally() {
        let src = "def f(y):\n    try:\n        return y\n    except Exception as e:\n        return str(e)\n    finally:\n        pass\n";
        let program = parse(src).unwrap();
        match &program.functions[0].body[0] {
            Stmt::Try {
                handlers, finalbody, ..
            } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].bound_name.as_deref(), Some("e"));
                assert_eq!(finalbody.len(), 1);
            }
            other => panic!("expected try, got {other:?}"),
        }
    }
}
