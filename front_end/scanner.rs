//! Source metadata scanner.
//!
//! Pure text analysis over the raw source, entirely independent of the
//! parser: blank/comment classification, indentation unit discovery,
//! multiline statement grouping, and conditional/exception sibling grouping.
//! Runs ahead of the AST walk so the CFG builder can attach this metadata to
//! instructions as it emits them. Never fails; malformed input yields
//! best-effort metadata.

use crate::commons::{Map, Set};

#[derive(Clone, Debug, Default)]
pub struct ScanResult {
    pub blank_lines: Set<usize>,
    pub comments: Set<usize>,
    /// Indentation depth of each line, in units of the discovered indent.
    pub line_indent: Map<usize, usize>,
    /// For every line that belongs to a multi-line logical statement, the
    /// full set of lines in that statement (including itself).
    pub multiline: Map<usize, Set<usize>>,
    pub conditionals: Map<usize, Set<usize>>,
    pub exceptions: Map<usize, Set<usize>>,
}

pub fn scan(source: &str, include_conditional: bool) -> ScanResult {
    let lines: Vec<&str> = source.lines().collect();
    let mut result = ScanResult::default();

    classify_blank_and_comments(&lines, &mut result);
    discover_indent_unit_and_depths(&lines, &mut result);
    discover_multiline_groups(&lines, &mut result);
    discover_sibling_groups(&lines, &result.line_indent.clone(), "if", "elif", "else", &mut result.conditionals);
    discover_sibling_groups(
        &lines,
        &result.line_indent.clone(),
        "try",
        "except",
        "finally",
        &mut result.exceptions,
    );

    if include_conditional {
        merge_into_multiline(&result.conditionals.clone(), &mut result.multiline);
        merge_into_multiline(&result.exceptions.clone(), &mut result.multiline);
    }

    result
}

fn merge_into_multiline(groups: &Map<usize, Set<usize>>, multiline: &mut Map<usize, Set<usize>>) {
    for (line, group) in groups {
        multiline.entry(*line).or_default().extend(group.iter().copied());
    }
}

fn classify_blank_and_comments(lines: &[&str], result: &mut ScanResult) {
    let mut in_block_comment = false;
    for (i, raw) in lines.iter().enumerate() {
        let lineno = i + 1;
        let stripped = raw.trim();
        if stripped.is_empty() {
            result.blank_lines.insert(lineno);
        }
        if in_block_comment || stripped.starts_with('#') {
            result.comments.insert(lineno);
        }
        for _ in 0..count_block_comment_toggles(stripped) {
            in_block_comment = !in_block_comment;
            if in_block_comment {
                result.comments.insert(lineno);
            }
        }
    }
}

/// Counts every non-overlapping occurrence, on this line, of a `"""` or
/// `'''` delimiter followed by a non-quote character, each of which toggles
/// whether we are inside a block-comment region. Mirrors the original's
/// `re.findall(r'"""[^"]', line)` — one toggle per match, scanned
/// left-to-right, non-overlapping. This is a lexical approximation, not a
/// string-literal parser.
fn count_block_comment_toggles(stripped: &str) -> usize {
    ["\"\"\"", "'''"]
        .iter()
        .map(|marker| count_marker_occurrences(stripped, marker))
        .sum()
}

fn count_marker_occurrences(stripped: &str, marker: &str) -> usize {
    let chars: Vec<char> = stripped.chars().collect();
    let mchars: Vec<char> = marker.chars().collect();
    let quote = mchars[0];
    let mut count = 0;
    let mut i = 0;
    while i + mchars.len() < chars.len() {
        if chars[i..i + mchars.len()] == mchars[..] && chars[i + mchars.len()] != quote {
            count += 1;
            i += mchars.len() + 1;
        } else {
            i += 1;
        }
    }
    count
}

fn discover_indent_unit_and_depths(lines: &[&str], result: &mut ScanResult) {
    let mut unit = None;
    for (i, raw) in lines.iter().enumerate() {
        let lineno = i + 1;
        if result.blank_lines.contains(&lineno) || result.comments.contains(&lineno) {
            continue;
        }
        let indent = raw.len() - raw.trim_start().len();
        if unit.is_none() && indent > 0 {
            unit = Some(indent);
        }
    }
    let unit = unit.unwrap_or(4).max(1);
    for (i, raw) in lines.iter().enumerate() {
        let lineno = i + 1;
        let indent = raw.len() - raw.trim_start().len();
        result.line_indent.insert(lineno, indent / unit);
    }
}

fn discover_multiline_groups(lines: &[&str], result: &mut ScanResult) {
    let mut depth: i32 = 0;
    let mut group_start: Option<usize> = None;
    let mut pending_backslash = false;
    let mut in_string: Option<char> = None;

    for (i, raw) in lines.iter().enumerate() {
        let lineno = i + 1;
        let was_open = depth > 0 || pending_backslash;
        if was_open && group_start.is_none() {
            group_start = Some(lineno - 1);
        }

        let mut escape = false;
        let mut ends_backslash = false;
        let mut saw_hash = false;
        let chars: Vec<char> = raw.chars().collect();
        for (idx, c) in chars.iter().enumerate() {
            if saw_hash {
                break;
            }
            if let Some(q) = in_string {
                if *c == q && !escape {
                    in_string = None;
                }
                escape = *c == '\\' && !escape;
                continue;
            }
            match c {
                '#' => saw_hash = true,
                '"' | '\'' => in_string = Some(*c),
                '(' => depth += 1,
                ')' => depth -= 1,
                '\\' if idx == chars.len() - 1 => ends_backslash = true,
                _ => {}
            }
        }

        let still_open = depth > 0 || ends_backslash;
        pending_backslash = ends_backslash;

        if !still_open {
            if let Some(start) = group_start.take() {
                let group: Set<usize> = (start..=lineno).collect();
                for l in &group {
                    result.multiline.insert(*l, group.clone());
                }
            }
        }
    }
    if let Some(start) = group_start {
        let group: Set<usize> = (start..=lines.len()).collect();
        for l in &group {
            result.multiline.insert(*l, group.clone());
        }
    }
}

/// Groups consecutive `if`/`elif`/`else` (or `try`/`except`/`finally`)
/// headers at the same indentation level into one sibling set.
fn discover_sibling_groups(
    lines: &[&str],
    line_indent: &Map<usize, usize>,
    head: &str,
    middle: &str,
    tail: &str,
    out: &mut Map<usize, Set<usize>>,
) {
    let mut i = 0;
    while i < lines.len() {
        let lineno = i + 1;
        let stripped = lines[i].trim_start();
        if starts_with_keyword(stripped, head) {
            let indent = *line_indent.get(&lineno).unwrap_or(&0);
            let mut group = vec![lineno];
            let mut cursor = i + 1;
            while let Some((next_idx, next_line)) = next_non_blank_comment(lines, cursor) {
                let next_lineno = next_idx + 1;
                let next_indent = *line_indent.get(&next_lineno).unwrap_or(&0);
                let next_stripped = next_line.trim_start();
                if next_indent == indent
                    && (starts_with_keyword(next_stripped, middle) || starts_with_keyword(next_stripped, tail))
                {
                    group.push(next_lineno);
                    cursor = next_idx + 1;
                } else {
                    break;
                }
            }
            if group.len() > 1 {
                let set: Set<usize> = group.into_iter().collect();
                for l in &set {
                    out.insert(*l, set.clone());
                }
            }
        }
        i += 1;
    }
}

fn next_non_blank_comment(lines: &[&str], from: usize) -> Option<(usize, &str)> {
    let mut j = from;
    while j < lines.len() {
        if !lines[j].trim().is_empty() && !lines[j].trim_start().starts_with('#') {
            return Some((j, lines[j]));
        }
        j += 1;
    }
    None
}

fn starts_with_keyword(stripped: &str, kw: &str) -> bool {
    stripped == kw
        || stripped.starts_with(&format!("{kw} "))
        || stripped.starts_with(&format!("{kw}:"))
        || stripped.starts_with(&format!("{kw}("))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_blank_and_comment_lines() {
        let src = "x = 1\n\n# a comment\ny = 2\n";
        let r = scan(src, false);
        assert!(r.blank_lines.contains(&2));
        assert!(r.comments.contains(&3));
        assert!(!r.comments.contains(&1));
    }

    #[test]
    fn groups_parenthesised_continuation() {
        let src = "def f(y):\n    x = (\"a\\n\"\n         \"b\"\n         \"c\")\n    return x\n";
        let r = scan(src, false);
        let group = r.multiline.get(&2).cloned().unwrap_or_default();
        assert_eq!(group, (2..=4).collect::<Set<usize>>());
        assert_eq!(r.multiline.get(&4), Some(&group));
    }

    #[test]
    fn discovers_indent_unit() {
        let src = "def f():\n    x = 1\n    return x\n";
        let r = scan(src, false);
        assert_eq!(r.line_indent.get(&2), Some(&1));
    }

    #[test]
    fn triple_quote_pair_on_one_line_is_a_net_no_op() {
        let src = "x = \"\"\"hi\"\"\" + \"end\"\ny = 2\n";
        let r = scan(src, false);
        assert!(!r.comments.contains(&1));
        assert!(!r.comments.contains(&2));
    }

    #[test]
    fn unterminated_triple_quote_latches_into_following_lines() {
        let src = "x = \"\"\"start\ny = 2\nz = \"\"\"end\nw = 3\n";
        let r = scan(src, false);
        assert!(r.comments.contains(&1));
        assert!(r.comments.contains(&2));
        assert!(r.comments.contains(&3));
        assert!(!r.comments.contains(&4));
    }
}
