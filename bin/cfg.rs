//! Dumps the control-flow graph the middle-end builds for every function in
//! a source file: read a file, run one pass, print the result, in the same
//! small one-phase style as the other `bin/` front-ends here.

use std::env;

use decompose_advisor::front_end::{parse, scanner, validate};
use decompose_advisor::middle_end::cfg;

fn read_from(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|_| panic!("Could not read the input file {path}"))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        panic!("usage: cfg <source-file>");
    }
    let source = read_from(&args[1]);

    let program = parse(&source).unwrap_or_else(|e| panic!("syntax error: {e}"));
    let validated = validate(program).unwrap_or_else(|e| panic!("{e}"));
    let scan = scanner::scan(&source, false);
    let block_list = cfg::build(&validated, &scan).unwrap_or_else(|e| panic!("{e}"));

    for func in &block_list.functions {
        println!("function {} (entry {}, exit {}):", func.name, func.entry, func.exit);
        for label in func.topo_order() {
            let block = func.get_block(label);
            let succs: Vec<String> = block.successors.iter().map(|l| l.to_string()).collect();
            println!("  {label} -> [{}]", succs.join(", "));
            for (line, instr) in &block.instructions {
                println!("    {line}: {:?}", instr.kind);
            }
        }
        println!();
    }
}
