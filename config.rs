//! Policy thresholds delivered by the front-end.
//!
//! The core validates none of these; they are trusted inputs read out of a
//! JSON document split into two nested groups, `generating_suggestions` and
//! `validating_suggestions`.

use serde::{Deserialize, Serialize};

use crate::error::{DecomposerError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // Numerics for generating suggestions.
    pub min_diff_complexity_between_slices: i64,
    pub min_diff_ref_and_live_var: i64,
    pub min_linenos_diff_reference_livevar_instr: i64,

    // Numerics for validating suggestions.
    pub min_lines_in_suggestion: i64,
    pub min_variables_parameter_in_suggestion: i64,
    pub max_variables_parameter_in_suggestion: i64,
    pub max_variables_return_in_suggestion: i64,
    pub min_lines_func_not_in_suggestion: i64,
}

/// Mirrors the on-disk JSON shape: two nested objects rather than one flat
/// record.
#[derive(Deserialize)]
struct GeneratingSuggestions {
    min_diff_complexity_between_slices: i64,
    min_diff_ref_and_live_var: i64,
    min_linenos_diff_reference_livevar_instr: i64,
}

#[derive(Deserialize)]
struct ValidatingSuggestions {
    min_lines_in_suggestion: i64,
    min_variables_parameter_in_suggestion: i64,
    max_variables_parameter_in_suggestion: i64,
    max_variables_return_in_suggestion: i64,
    min_lines_func_not_in_suggestion: i64,
}

#[derive(Deserialize)]
struct ConfigDoc {
    generating_suggestions: GeneratingSuggestions,
    validating_suggestions: ValidatingSuggestions,
}

impl Default for Config {
    /// The reference configuration used when no config file is supplied.
    fn default() -> Self {
        Config {
            min_diff_complexity_between_slices: 3,
            min_diff_ref_and_live_var: 4,
            min_linenos_diff_reference_livevar_instr: 4,
            min_lines_in_suggestion: 3,
            min_variables_parameter_in_suggestion: 1,
            max_variables_parameter_in_suggestion: 6,
            max_variables_return_in_suggestion: 3,
            min_lines_func_not_in_suggestion: 5,
        }
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Config> {
        let doc: ConfigDoc = serde_json::from_str(text)
            .map_err(|e| DecomposerError::ConfigNotAvailable(e.to_string()))?;
        Ok(Config {
            min_diff_complexity_between_slices: doc.generating_suggestions.min_diff_complexity_between_slices,
            min_diff_ref_and_live_var: doc.generating_suggestions.min_diff_ref_and_live_var,
            min_linenos_diff_reference_livevar_instr: doc
                .generating_suggestions
                .min_linenos_diff_reference_livevar_instr,
            min_lines_in_suggestion: doc.validating_suggestions.min_lines_in_suggestion,
            min_variables_parameter_in_suggestion: doc
                .validating_suggestions
                .min_variables_parameter_in_suggestion,
            max_variables_parameter_in_suggestion: doc
                .validating_suggestions
                .max_variables_parameter_in_suggestion,
            max_variables_return_in_suggestion: doc.validating_suggestions.max_variables_return_in_suggestion,
            min_lines_func_not_in_suggestion: doc.validating_suggestions.min_lines_func_not_in_suggestion,
        })
    }

    pub fn from_file(path: &str) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DecomposerError::ConfigNotAvailable(format!("{path}: {e}")))?;
        Config::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_json_document() {
        let text = r#"{
            "generating_suggestions": {
                "min_diff_complexity_between_slices": 3,
                "min_diff_ref_and_live_var": 4,
                "min_linenos_diff_reference_livevar_instr": 4
            },
            "validating_suggestions": {
                "min_lines_in_suggestion": 3,
                "min_variables_parameter_in_suggestion": 1,
                "max_variables_parameter_in_suggestion": 6,
                "max_variables_return_in_suggestion": 3,
                "min_lines_func_not_in_suggestion": 5
            }
        }"#;
        assert_eq!(Config::from_json_str(text).unwrap(), Config::default());
    }

    #[test]
    fn rejects_malformed_document() {
        assert!(Config::from_json_str("{}").is_err());
    }
}
