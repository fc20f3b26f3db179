//! Range normalisation pipeline shared by all four heuristics: group flagged
//! lines into contiguous runs, then split and trim them against multiline,
//! control, and indentation structure until the shape stops changing.

use std::cell::RefCell;

use crate::commons::{Map, Set};
use crate::middle_end::cfg::block::FunctionBlock;

/// Splits sorted line numbers into runs separated by a gap of >= 2; each run
/// of more than one line becomes a candidate `(min, max)`.
pub fn group_suggestions(linenos: &Set<usize>) -> Set<(usize, usize)> {
    let mut groups = Set::new();
    let mut run_start: Option<usize> = None;
    let mut prev: Option<usize> = None;
    for &line in linenos {
        if let Some(p) = prev {
            if line - p >= 2 {
                if let (Some(s), Some(p)) = (run_start, prev) {
                    if p > s {
                        groups.insert((s, p));
                    }
                }
                run_start = Some(line);
            }
        } else {
            run_start = Some(line);
        }
        prev = Some(line);
    }
    if let (Some(s), Some(p)) = (run_start, prev) {
        if p > s {
            groups.insert((s, p));
        }
    }
    groups
}

/// Adds every multiline-group member not already an instruction line.
fn add_multiline_statements(lines: &Set<usize>, multiline: &Map<usize, Set<usize>>, known_linenos: &Set<usize>) -> Set<usize> {
    let mut out = lines.clone();
    for line in lines {
        if let Some(group) = multiline.get(line) {
            for m in group {
                if !known_linenos.contains(m) {
                    out.insert(*m);
                }
            }
        }
    }
    out
}

fn split_groups_indentation(groups: &Set<(usize, usize)>, instr_indent: &Map<usize, usize>) -> Set<(usize, usize)> {
    let mut out = Set::new();
    for &(min_l, max_l) in groups {
        let mut start_indent: Option<usize> = None;
        let mut start_lineno = min_l;
        let mut last = min_l;
        for lineno in min_l..=max_l {
            if let Some(&cur_indent) = instr_indent.get(&lineno) {
                match start_indent {
                    None => {
                        start_indent = Some(cur_indent);
                        start_lineno = lineno;
                    }
                    Some(si) if cur_indent < si => {
                        out.insert((start_lineno, last));
                        start_indent = Some(cur_indent);
                        start_lineno = lineno;
                    }
                    _ => {}
                }
            }
            last = lineno;
        }
        out.insert((start_lineno, last));
    }
    out
}

fn adjust_multiline_groups(groups: &Set<(usize, usize)>, multiline: &Map<usize, Set<usize>>) -> Set<(usize, usize)> {
    let mut out = Set::new();
    for &(min_l, max_l) in groups {
        let linenos: Set<usize> = (min_l..=max_l).collect();
        let mut final_linenos = Set::new();
        for lineno in min_l..=max_l {
            match multiline.get(&lineno) {
                Some(group) if group.iter().all(|l| linenos.contains(l)) => {
                    final_linenos.insert(lineno);
                }
                Some(_) => {}
                None => {
                    final_linenos.insert(lineno);
                }
            }
        }
        out.extend(group_suggestions(&final_linenos));
    }
    out
}

fn adjust_control_groups(groups: &Set<(usize, usize)>, controls: &Map<usize, Set<usize>>) -> Set<(usize, usize)> {
    let mut out = Set::new();
    for &(min_l, max_l) in groups {
        let linenos: Set<usize> = (min_l..=max_l).collect();
        let mut final_linenos = Set::new();
        for lineno in min_l..=max_l {
            match controls.get(&lineno) {
                Some(controlled) if controlled.intersection(&linenos).count() == controlled.len() => {
                    final_linenos.insert(lineno);
                }
                Some(_) => {}
                None => {
                    final_linenos.insert(lineno);
                }
            }
        }
        out.extend(group_suggestions(&final_linenos));
    }
    out
}

fn trim_unimportant(groups: &Set<(usize, usize)>, unimportant: &Set<usize>) -> Set<(usize, usize)> {
    let mut out = Set::new();
    for &(min_l, max_l) in groups {
        let mut lo = min_l;
        let mut hi = max_l;
        while hi > lo && unimportant.contains(&hi) {
            hi -= 1;
        }
        while lo < hi && unimportant.contains(&lo) {
            lo += 1;
        }
        if lo < hi {
            out.insert((lo, hi));
        }
    }
    out
}

/// Per-function metadata the pipeline needs, computed once from the
/// condensed function and reused by every heuristic.
pub struct NormalizeContext<'a> {
    func: &'a FunctionBlock,
    multiline: Map<usize, Set<usize>>,
    controls: Map<usize, Set<usize>>,
    instr_indent: Map<usize, usize>,
    known_linenos: Set<usize>,
    cache: RefCell<Map<(usize, usize), Set<(usize, usize)>>>,
}

impl<'a> NormalizeContext<'a> {
    pub fn new(func: &'a FunctionBlock) -> Self {
        let mut multiline = Map::new();
        let mut controls: Map<usize, Set<usize>> = Map::new();
        let mut instr_indent = Map::new();
        let mut known_linenos = Set::new();
        for instr in func.all_instructions() {
            known_linenos.insert(instr.line);
            instr_indent.insert(instr.line, instr.indentation);
            if !instr.multiline.is_empty() {
                let mut group = instr.multiline.clone();
                group.insert(instr.line);
                for member in &group {
                    multiline.insert(*member, group.clone());
                }
            }
            if let Some(control) = instr.control {
                controls.entry(control).or_default().insert(instr.line);
            }
        }
        NormalizeContext {
            func,
            multiline,
            controls,
            instr_indent,
            known_linenos,
            cache: RefCell::new(Map::new()),
        }
    }

    /// Repeatedly applies indentation/multiline/control splitting to a
    /// fixed point, then trims unimportant lines off both ends. Memoised by
    /// `{min, max}` key.
    pub fn split_groups_linenos(&self, groups: &Set<(usize, usize)>) -> Set<(usize, usize)> {
        let mut final_suggestions = Set::new();
        for &(min_l, max_l) in groups {
            if let Some(cached) = self.cache.borrow().get(&(min_l, max_l)) {
                final_suggestions.extend(cached.iter().copied());
                continue;
            }
            let mut suggestions: Set<(usize, usize)> = Set::from_iter([(min_l, max_l)]);
            loop {
                let prev = suggestions.clone();
                suggestions = split_groups_indentation(&suggestions, &self.instr_indent);
                suggestions = adjust_multiline_groups(&suggestions, &self.multiline);
                suggestions = adjust_control_groups(&suggestions, &self.controls);
                if suggestions == prev {
                    break;
                }
            }
            suggestions = trim_unimportant(&suggestions, &self.func.unimportant());
            self.cache.borrow_mut().insert((min_l, max_l), suggestions.clone());
            final_suggestions.extend(suggestions);
        }
        final_suggestions
    }

    /// The full pipeline from a raw set of flagged lines to normalised
    /// ranges: add multiline continuations, fold in unimportant lines so
    /// blank/comment gaps don't split a range, group into runs, then split
    /// to a fixed point and trim.
    pub fn group_with_unimportant(&self, linenos: &Set<usize>) -> Set<(usize, usize)> {
        if linenos.is_empty() {
            return Set::new();
        }
        let mut lines = add_multiline_statements(linenos, &self.multiline, &self.known_linenos);
        lines.extend(self.func.unimportant());
        let groups = group_suggestions(&lines);
        self.split_groups_linenos(&groups)
    }
}
