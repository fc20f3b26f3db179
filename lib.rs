//! `decompose_advisor`: suggests candidate sub-functions for a Python
//! function by combining control-flow analysis, dataflow analysis and
//! program slicing.
//!
//! The public entry point is [`analyze`]: front-end scan/parse/validate,
//! middle-end CFG construction, then one suggestion-engine pass per
//! function.

pub mod commons;
pub mod config;
pub mod error;
pub mod front_end;
pub mod middle_end;

use serde::Serialize;

use config::Config;
use error::{DecomposerError, Result};
use front_end::scanner;
use middle_end::cfg;
use middle_end::suggest::{self, types::Suggestion};

/// One function's suggestions plus its average line-number-weighted slice
/// complexity (an optional diagnostic for the front-end).
#[derive(Clone, Debug, Serialize)]
pub struct FunctionReport {
    pub function: String,
    pub suggestions: Vec<Suggestion>,
    pub avg_lineno_slice_complexity: f64,
}

/// Runs the full pipeline over `source` and returns one report per
/// top-level function, in source order.
///
/// `slow` enables the heavier 3-/4-variable grouping pass of the RemoveVar
/// heuristic; omit it for the fast path.
pub fn analyze(source: &str, config: &Config, slow: bool) -> Result<Vec<FunctionReport>> {
    let program = front_end::parse(source).map_err(|e| DecomposerError::ParseError(e.0))?;
    let validated = front_end::validate(program)?;
    let scan = scanner::scan(source, false);
    let block_list = cfg::build(&validated, &scan)?;

    let mut reports = Vec::with_capacity(block_list.functions.len());
    for func in &block_list.functions {
        let (suggestions, avg_lineno_slice_complexity) = suggest::suggest(func, config, slow);
        reports.push(FunctionReport {
            function: func.name.clone(),
            suggestions,
            avg_lineno_slice_complexity,
        });
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_reports_one_entry_per_function() {
        let config = Config::default();
        let source = "def a(x):\n    return x\n\ndef b(y):\n    return y\n";
        let reports = analyze(source, &config, false).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].function, "a");
        assert_eq!(reports[1].function, "b");
    }

    #[test]
    fn analyze_rejects_nested_function_definitions() {
        let config = Config::default();
        let source = "def a():\n    def b():\n        pass\n    return 1\n";
        let result = analyze(source, &config, false);
        assert!(matches!(result, Err(DecomposerError::NestedFunctionRejected(_))));
    }
}
