//! Tokeniser for the Python-like subset the parser accepts.
//!
//! Two passes, matching how Python's own tokenizer works: `logos` recognises
//! the word-level tokens (keywords, identifiers, literals, operators) within
//! one logical line, and a thin wrapper above it tracks indentation and
//! statement continuation (parenthesis depth, trailing backslash) to turn
//! physical lines into the `Indent`/`Dedent`/`Newline`-delimited stream a
//! recursive-descent parser expects.

use logos::Logos;

#[derive(Logos, Clone, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
pub enum Word {
    #[token("def")]
    Def,
    #[token("return")]
    Return,
    #[token("raise")]
    Raise,
    #[token("pass")]
    Pass,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("in")]
    In,
    #[token("try")]
    Try,
    #[token("except")]
    Except,
    #[token("finally")]
    Finally,
    #[token("as")]
    As,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r"'([^'\\]|\\.)*'", |lex| lex.slice().to_string())]
    Str(String),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[regex(r"[+\-*/%]")]
    Arith,
    #[regex(r"==|!=|<=|>=|<|>")]
    Compare,
    #[regex(r"and|or|not")]
    BoolOp,
    #[token("#")]
    Hash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Indent,
    Dedent,
    Newline,
    Word(Word),
    Eof,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Tokenises `code`, including synthetic `Indent`/`Dedent`/`Newline`
/// markers, ending with an `Eof` token. Comments (`#...`) and blank lines are
/// dropped entirely; they are the scanner's concern, not the parser's.
pub fn lex(code: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut indent_stack = vec![0usize];
    let mut depth = 0i32;
    let mut pending_line = String::new();
    let mut pending_start_line = 0usize;
    let mut pending_active = false;

    let lines: Vec<&str> = code.lines().collect();
    let mut i = 0usize;
    while i < lines.len() {
        let raw = lines[i];
        let lineno = i + 1;
        let stripped = raw.trim_start();
        let trimmed = stripped.trim_end();

        if !pending_active {
            if trimmed.is_empty() || trimmed.starts_with('#') {
                i += 1;
                continue;
            }
            pending_active = true;
            pending_start_line = lineno;
            pending_line.clear();
            let indent = raw.len() - stripped.len();
            emit_indentation(&mut tokens, &mut indent_stack, indent, lineno);
        } else {
            pending_line.push(' ');
        }

        let mut content = trimmed;
        let continues_backslash = content.ends_with('\\');
        if continues_backslash {
            content = &content[..content.len() - 1];
        }
        depth += bracket_delta(content);
        pending_line.push_str(content);

        if depth <= 0 && !continues_backslash {
            depth = 0;
            tokenize_logical_line(&pending_line, pending_start_line, &mut tokens);
            tokens.push(Token {
                kind: TokenKind::Newline,
                line: pending_start_line,
            });
            pending_active = false;
        }
        i += 1;
    }

    while indent_stack.len() > 1 {
        indent_stack.pop();
        tokens.push(Token {
            kind: TokenKind::Dedent,
            line: lines.len() + 1,
        });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line: lines.len() + 1,
    });
    tokens
}

fn emit_indentation(tokens: &mut Vec<Token>, stack: &mut Vec<usize>, indent: usize, line: usize) {
    let top = *stack.last().unwrap();
    if indent > top {
        stack.push(indent);
        tokens.push(Token {
            kind: TokenKind::Indent,
            line,
        });
    } else {
        while *stack.last().unwrap() > indent {
            stack.pop();
            tokens.push(Token {
                kind: TokenKind::Dedent,
                line,
            });
        }
    }
}

/// Net change in bracket depth contributed by one physical line's content,
/// ignoring brackets that appear inside string literals or after `#`.
fn bracket_delta(content: &str) -> i32 {
    let mut delta = 0;
    let mut in_string: Option<char> = None;
    let mut prev_escape = false;
    for c in content.chars() {
        if let Some(q) = in_string {
            if c == q && !prev_escape {
                in_string = None;
            }
            prev_escape = c == '\\' && !prev_escape;
            continue;
        }
        match c {
            '#' => break,
            '"' | '\'' => in_string = Some(c),
            '(' | '[' => delta += 1,
            ')' | ']' => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn tokenize_logical_line(line: &str, lineno: usize, out: &mut Vec<Token>) {
    let mut lexer = Word::lexer(line);
    while let Some(result) = lexer.next() {
        if let Ok(word) = result {
            out.push(Token {
                kind: TokenKind::Word(word),
                line: lineno,
            });
        }
    }
}
