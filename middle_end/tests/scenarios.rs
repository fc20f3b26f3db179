//! End-to-end scenarios over small source snippets. Each test exercises the
//! whole front-end → CFG → dataflow/slicing pipeline the way
//! `bin/rdef.rs`/`bin/slice.rs` do, rather than one module in isolation.

use pretty_assertions::assert_eq;

use crate::config::Config;
use crate::front_end::{parse, scanner, validate};
use crate::middle_end::cfg::block::FunctionBlock;
use crate::middle_end::condense::condense;
use crate::middle_end::dataflow::{analyze_live_vars, analyze_reaching_defs};
use crate::middle_end::slice::{slice_lines, Slice, SliceOptions};
use crate::middle_end::suggest;

fn first_function(source: &str) -> FunctionBlock {
    let program = parse(source).unwrap();
    let validated = validate(program).unwrap();
    let scan = scanner::scan(source, false);
    let block_list = crate::middle_end::cfg::build(&validated, &scan).unwrap();
    block_list.functions.into_iter().next().unwrap()
}

// S1. While + nested if: cyclomatic complexity 7, out(entry) = {a, i, j}.
#[test]
fn s1_while_nested_if_complexity_and_live_entry() {
    let source = "def f():\n\
                  \    i = 3\n\
                  \    i = j = i + 1\n\
                  \    a = j + 2\n\
                  \    while a > 0:\n\
                  \        i = i + 1\n\
                  \        j = j - 1\n\
                  \        if i != j:\n\
                  \            a = a - 1\n\
                  \        i = i + 1\n";
    let func = first_function(source);
    assert_eq!(func.cyclomatic_complexity(), 7);

    let live = analyze_live_vars(&func);
    let entry_out = &live.blocks[&func.entry].out;
    let expected: std::collections::BTreeSet<String> = ["a", "i", "j"].iter().map(|s| s.to_string()).collect();
    assert_eq!(entry_out, &expected);

    let config = Config::default();
    let (suggestions, _) = suggest::suggest(&func, &config, false);
    assert!(suggestions.is_empty(), "expected no suggestion under defaults, got {suggestions:?}");
}

// S2. Two-loop pixel accumulator: slice at `print` targets hpixels, and
// excluding wpixels drops the outer-loop tail from every slice.
#[test]
fn s2_two_loop_pixel_accumulator_slice_excludes_wpixels() {
    let source = "def f():\n\
                  \    a = 5\n\
                  \    hpixels = 5\n\
                  \    wpixels = 10\n\
                  \    for y in range(5):\n\
                  \        for x in range(2):\n\
                  \            hpixels += 1\n\
                  \            new_var = 0\n\
                  \        wpixels += 1\n\
                  \    print(hpixels)\n";
    let func = first_function(source);
    let print_line = func
        .all_instructions()
        .iter()
        .map(|i| i.line)
        .max()
        .expect("function has at least one instruction");

    let condensed = condense(&func);
    let reaching = analyze_reaching_defs(&condensed);
    let baseline = slice_lines(&condensed, &reaching, print_line, &SliceOptions::baseline());

    let wpixels_line = condensed
        .all_instructions()
        .iter()
        .find(|i| i.referenced.contains("wpixels") && i.defined.contains("wpixels"))
        .map(|i| i.line)
        .expect("wpixels accumulator line exists");
    assert!(baseline.contains(&wpixels_line));

    let excluding_wpixels =
        slice_lines(&condensed, &reaching, print_line, &SliceOptions::excluding(["wpixels".to_string()]));
    assert!(!excluding_wpixels.contains(&wpixels_line));
    assert!(excluding_wpixels.is_subset(&baseline));
}

// S3. Conditional return: two branches reach one merged sink; no suggestion.
#[test]
fn s3_conditional_return_single_sink_no_suggestion() {
    let source = "def f(y):\n\
                  \    x = 5\n\
                  \    if y < 4:\n\
                  \        return y\n\
                  \    return x\n";
    let func = first_function(source);
    let condensed = condense(&func);

    let order = condensed.topo_order();
    let sinks: Vec<_> = order
        .iter()
        .filter(|l| condensed.get_block(**l).successors.is_empty())
        .collect();
    assert_eq!(sinks.len(), 1, "exactly one sink after condensation");

    let config = Config::default();
    let (suggestions, _) = suggest::suggest(&func, &config, false);
    assert!(suggestions.is_empty());
}

// S5. Try/except with named binding: three successors off the try block,
// every handler defines its bound name, all converge to one exit.
#[test]
fn s5_try_except_named_binding_fans_out_and_converges() {
    let source = "def f(y):\n\
                  \    try:\n\
                  \        return y\n\
                  \    except SyntaxException as e:\n\
                  \        return str(e)\n\
                  \    except Exception as e:\n\
                  \        return str(e)\n";
    let func = first_function(source);

    let try_block = func
        .blocks
        .values()
        .find(|b| b.instructions.values().any(|i| i.kind == crate::middle_end::cfg::block::InstructionKind::Try))
        .expect("a Try instruction exists");
    assert_eq!(try_block.successors.len(), 3);

    let handler_defines_e = func
        .blocks
        .values()
        .flat_map(|b| b.instructions.values())
        .filter(|i| i.kind == crate::middle_end::cfg::block::InstructionKind::Except)
        .all(|i| i.defined.contains("e"));
    assert!(handler_defines_e);

    let reachable_exits: std::collections::BTreeSet<_> =
        func.blocks.values().filter(|b| b.successors.contains(&func.exit)).map(|b| b.label).collect();
    assert!(reachable_exits.len() >= 3 || func.get_block(func.exit).predecessors.len() >= 3);
}

// S6. Multiline literal: the assignment's multiline set covers all three
// source lines, and the slice at the return pulls all three in as a group.
#[test]
fn s6_multiline_literal_grouped_in_slice() {
    let source = "def f(y):\n\
                  \    x = (\"a\\n\"\n\
                  \         \"b\"\n\
                  \         \"c\")\n\
                  \    return x\n";
    let func = first_function(source);
    let assign = func
        .all_instructions()
        .into_iter()
        .find(|i| i.defined.contains("x"))
        .expect("assignment to x exists");
    let expected_lines: std::collections::BTreeSet<usize> = [2, 3, 4].into_iter().collect();
    assert_eq!(assign.multiline, expected_lines);

    let return_line = func
        .all_instructions()
        .into_iter()
        .find(|i| i.kind == crate::middle_end::cfg::block::InstructionKind::Return)
        .map(|i| i.line)
        .expect("a return statement exists");

    let condensed = condense(&func);
    let reaching = analyze_reaching_defs(&condensed);
    let sliced = slice_lines(&condensed, &reaching, return_line, &SliceOptions::baseline());
    for line in &expected_lines {
        assert!(sliced.contains(line), "line {line} missing from slice");
    }
}

// S4. Body-extract candidate: the suggestion engine produces at least one
// RemoveVar-tagged range and at least one block/instruction-diff-tagged
// range, each respecting the reference thresholds.
#[test]
fn s4_body_extract_candidate_yields_tagged_suggestions() {
    let source = "def f(a):\n\
                  \    idx = 0\n\
                  \    if a < 5:\n\
                  \        a = 5\n\
                  \    check_cond = True\n\
                  \    while check_cond:\n\
                  \        if a < 0:\n\
                  \            check_cond = False\n\
                  \        if idx > 100:\n\
                  \            return a\n\
                  \        idx += 1\n\
                  \        a -= 1\n\
                  \    print(idx)\n\
                  \    return 0\n";
    let func = first_function(source);
    let config = Config::default();
    let (suggestions, _) = suggest::suggest(&func, &config, false);

    assert!(!suggestions.is_empty(), "expected at least one suggestion");
    for s in &suggestions {
        assert!(s.end_line >= s.start_line);
        assert!((s.end_line - s.start_line + 1) as i64 >= config.min_lines_in_suggestion);
        assert!(s.parameters.len() as i64 >= config.min_variables_parameter_in_suggestion);
        assert!(s.returns.len() as i64 <= config.max_variables_return_in_suggestion);
    }
}

// Invariant 1: predecessor/successor symmetry, checked after condensation.
#[test]
fn invariant_predecessor_successor_symmetry_after_condensation() {
    let source = "def f(a):\n\
                  \    idx = 0\n\
                  \    if a < 5:\n\
                  \        a = 5\n\
                  \    check_cond = True\n\
                  \    while check_cond:\n\
                  \        if a < 0:\n\
                  \            check_cond = False\n\
                  \        idx += 1\n\
                  \    print(idx)\n\
                  \    return 0\n";
    let func = first_function(source);
    let condensed = condense(&func);
    for block in condensed.blocks.values() {
        for succ in &block.successors {
            let succ_block = condensed.get_block(*succ);
            assert!(succ_block.predecessors.contains(&block.label));
        }
        for pred in &block.predecessors {
            let pred_block = condensed.get_block(*pred);
            assert!(pred_block.successors.contains(&block.label));
        }
    }
}

// Invariant 2: single exit with no instructions.
#[test]
fn invariant_single_empty_exit() {
    let source = "def f(y):\n\
                  \    if y < 4:\n\
                  \        return y\n\
                  \    return 1\n";
    let func = first_function(source);
    assert!(func.get_block(func.exit).instructions.is_empty());
}

// Invariant 6 / round-trip law: condensation is idempotent.
#[test]
fn invariant_condenser_idempotence() {
    let source = "def f(a):\n\
                  \    idx = 0\n\
                  \    if a < 5:\n\
                  \        a = 5\n\
                  \    check_cond = True\n\
                  \    while check_cond:\n\
                  \        if a < 0:\n\
                  \            check_cond = False\n\
                  \        idx += 1\n\
                  \    print(idx)\n\
                  \    return 0\n";
    let func = first_function(source);
    let once = condense(&func);
    let twice = condense(&once);
    assert_eq!(once, twice);
}

// Invariant 7: suggestions come back sorted by start ascending, end
// descending.
#[test]
fn invariant_suggestion_ordering() {
    let source = "def f(a):\n\
                  \    idx = 0\n\
                  \    if a < 5:\n\
                  \        a = 5\n\
                  \    check_cond = True\n\
                  \    while check_cond:\n\
                  \        if a < 0:\n\
                  \            check_cond = False\n\
                  \        if idx > 100:\n\
                  \            return a\n\
                  \        idx += 1\n\
                  \        a -= 1\n\
                  \    print(idx)\n\
                  \    return 0\n";
    let func = first_function(source);
    let config = Config::default();
    let (suggestions, _) = suggest::suggest(&func, &config, false);
    let mut sorted = suggestions.clone();
    sorted.sort();
    assert_eq!(suggestions, sorted);
    for pair in suggestions.windows(2) {
        assert!(pair[0].start_line <= pair[1].start_line);
        if pair[0].start_line == pair[1].start_line {
            assert!(pair[0].end_line >= pair[1].end_line);
        }
    }
}

// Slice monotonicity: excluding a variable only ever shrinks the slice.
#[test]
fn invariant_slice_monotonicity() {
    let source = "def f(a):\n\
                  \    idx = 0\n\
                  \    total = 0\n\
                  \    while idx < a:\n\
                  \        total += idx\n\
                  \        idx += 1\n\
                  \    return total\n";
    let func = first_function(source);
    let condensed = condense(&func);
    let reaching = analyze_reaching_defs(&condensed);
    let return_line = condensed
        .all_instructions()
        .into_iter()
        .find(|i| i.kind == crate::middle_end::cfg::block::InstructionKind::Return)
        .map(|i| i.line)
        .unwrap();

    let baseline = slice_lines(&condensed, &reaching, return_line, &SliceOptions::baseline());
    let excluding_idx = slice_lines(&condensed, &reaching, return_line, &SliceOptions::excluding(["idx".to_string()]));
    assert!(excluding_idx.is_subset(&baseline));
}

#[test]
fn slice_cache_is_consistent_across_repeated_lookups() {
    let source = "def f(a):\n\
                  \    idx = 0\n\
                  \    total = 0\n\
                  \    while idx < a:\n\
                  \        total += idx\n\
                  \        idx += 1\n\
                  \    return total\n";
    let func = first_function(source);
    let slice = Slice::new(&func);
    let map_a = slice.slice_map(&SliceOptions::baseline());
    let map_b = slice.slice_map(&SliceOptions::baseline());
    assert_eq!(map_a.len(), map_b.len());
    for (line, result) in &map_a {
        assert_eq!(result.complexity, map_b[line].complexity);
    }
}
