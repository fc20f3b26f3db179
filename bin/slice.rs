//! Dumps the backward slice anchored at one line of one function: the
//! collected line numbers, the materialized slice CFG's block structure,
//! and its cyclomatic complexity.

use std::env;

use decompose_advisor::front_end::{parse, scanner, validate};
use decompose_advisor::middle_end::cfg;
use decompose_advisor::middle_end::slice::{Slice, SliceOptions};

fn read_from(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|_| panic!("Could not read the input file {path}"))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        panic!("usage: slice <source-file> <function-name> <line-number>");
    }
    let source = read_from(&args[1]);
    let function_name = &args[2];
    let lineno: usize = args[3].parse().unwrap_or_else(|_| panic!("not a line number: {}", args[3]));

    let program = parse(&source).unwrap_or_else(|e| panic!("syntax error: {e}"));
    let validated = validate(program).unwrap_or_else(|e| panic!("{e}"));
    let scan = scanner::scan(&source, false);
    let block_list = cfg::build(&validated, &scan).unwrap_or_else(|e| panic!("{e}"));

    let func = block_list
        .functions
        .iter()
        .find(|f| &f.name == function_name)
        .unwrap_or_else(|| panic!("no such function: {function_name}"));

    let slice = Slice::new(func);
    let lines = decompose_advisor::middle_end::slice::slice_lines(
        &slice.func,
        &slice.reaching,
        lineno,
        &SliceOptions::baseline(),
    );
    let result = slice.get_slice(&lines);

    println!("lines: {}", lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", "));
    println!("complexity: {}", result.complexity);
    for label in result.cfg.topo_order() {
        let block = result.cfg.get_block(label);
        println!("  {label}: {:?}", block.linenos());
    }
}
