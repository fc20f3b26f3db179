//! Dumps live-variables facts for one function, the backward counterpart of
//! `bin/rdef.rs`.

use std::env;

use decompose_advisor::front_end::{parse, scanner, validate};
use decompose_advisor::middle_end::cfg;
use decompose_advisor::middle_end::dataflow::analyze_live_vars;

fn read_from(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|_| panic!("Could not read the input file {path}"))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        panic!("usage: live <source-file> <function-name>");
    }
    let source = read_from(&args[1]);
    let function_name = &args[2];

    let program = parse(&source).unwrap_or_else(|e| panic!("syntax error: {e}"));
    let validated = validate(program).unwrap_or_else(|e| panic!("{e}"));
    let scan = scanner::scan(&source, false);
    let block_list = cfg::build(&validated, &scan).unwrap_or_else(|e| panic!("{e}"));

    let func = block_list
        .functions
        .iter()
        .find(|f| &f.name == function_name)
        .unwrap_or_else(|| panic!("no such function: {function_name}"));

    let live = analyze_live_vars(func);
    for label in func.topo_order() {
        let facts = &live.blocks[&label];
        let vars: Vec<&String> = facts.in_.iter().collect();
        println!("{label}: in = {{{}}}", vars.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", "));
    }
}
