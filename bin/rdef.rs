//! Dumps reaching-definitions facts for one function: read a file, analyze
//! one function, print the per-block fact table.

use std::env;

use decompose_advisor::front_end::{parse, scanner, validate};
use decompose_advisor::middle_end::cfg;
use decompose_advisor::middle_end::dataflow::analyze_reaching_defs;

fn read_from(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|_| panic!("Could not read the input file {path}"))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        panic!("usage: rdef <source-file> <function-name>");
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

    let reaching = analyze_reaching_defs(func);
    for label in func.topo_order() {
        let facts = &reaching.blocks[&label];
        println!("{label}:");
        for (var, sites) in &facts.in_ {
            if sites.is_empty() {
                continue;
            }
            let rendered: Vec<String> = sites.iter().map(|(bb, line)| format!("{bb}@{line}")).collect();
            println!("  in[{var}] = {{{}}}", rendered.join(", "));
        }
    }
}
