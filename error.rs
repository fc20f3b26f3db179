//! Errors the core surfaces outward.
//!
//! Everything else is either an internal invariant (an `assert!` /
//! `unreachable!` away from a bug report) or silent best-effort recovery —
//! the core never throws from its analysis paths.

use derive_more::Display;

/// A decomposer error with explanatory message: a small `Display`-only
/// error type, not a kitchen-sink error enum with backtraces.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum DecomposerError {
    /// The front-end could not read the input source file.
    #[display(fmt = "source not available: {_0}")]
    SourceNotAvailable(String),

    /// The front-end could not read the policy/config record.
    #[display(fmt = "config not available: {_0}")]
    ConfigNotAvailable(String),

    /// A function definition was found nested inside another function's
    /// body. Carries the line number of the inner definition.
    #[display(fmt = "function defined inside another function on line {_0}")]
    NestedFunctionRejected(usize),

    /// The source text could not be parsed by the front-end at all. This
    /// sits outside the three error kinds the core proper raises (those
    /// assume the AST frontend already delivered a tree) but is needed for
    /// `parse` to have a return type.
    #[display(fmt = "parse error: {_0}")]
    ParseError(String),
}

impl std::error::Error for DecomposerError {}

pub type Result<T> = std::result::Result<T, DecomposerError>;
