//! The command-line front-end: reads a source file and a JSON config, prints
//! linter cosmetic suggestions, then the decomposition engine's
//! suggestions, `clap::Parser`-derive style.

use std::io::Write;

use clap::Parser;

use decompose_advisor::config::Config;
use decompose_advisor::front_end::{self, linter};
use decompose_advisor::{analyze, FunctionReport};

const PROGRESS_BAR_WIDTH: usize = 40;

#[derive(Parser)]
#[command(version, about = "Suggests candidate sub-functions for a Python source file.")]
struct Args {
    /// File to parse.
    filename: String,

    /// JSON configuration file.
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Generate all suggestions, including the slower variable-group pass.
    #[arg(long)]
    slow: bool,

    /// Print debug messages (linter suggestions).
    #[arg(long)]
    debug: bool,

    /// Do not print the progress indicator.
    #[arg(long)]
    noprogress: bool,
}

fn progress_bar(noprogress: bool, func_num: usize, num_funcs: usize) {
    if noprogress {
        return;
    }
    let percent = func_num as f64 / (num_funcs + 1) as f64;
    let arrow_len = (percent * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let arrow_len = arrow_len.saturating_sub(1);
    let arrow = format!("{}>", "-".repeat(arrow_len));
    let spaces = " ".repeat(PROGRESS_BAR_WIDTH.saturating_sub(arrow.len()));
    print!("\rStatus: [{arrow}{spaces}] {}%", (percent * 100.0).round() as i64);
    std::io::stdout().flush().ok();
}

fn remove_progress_bar(noprogress: bool) {
    if !noprogress {
        print!("\r");
        std::io::stdout().flush().ok();
    }
}

fn print_linter_suggestions(source: &str, program: &front_end::ast::Program, debug: bool) {
    if !debug {
        return;
    }
    let suggestions = linter::lint(source, program);
    if suggestions.is_empty() {
        return;
    }
    println!(
        "Each message below indicates formatting related messages. Fixing of the primary \
         suggestions from the decomposer.\n"
    );
    for (lineno, messages) in &suggestions {
        println!("\tline {lineno}: {}", messages.join(" "));
    }
    println!();
}

fn print_reports(filename: &str, reports: &[FunctionReport], slow: bool) {
    let total: usize = reports.iter().map(|r| r.suggestions.len()).sum();
    if total == 0 {
        print!("No suggestions detected.");
        if !slow {
            println!(" For additional suggestions try using the flag --slow.\n");
        } else {
            println!("{}", " ".repeat(PROGRESS_BAR_WIDTH));
        }
        return;
    }

    print!(
        "Each message below indicates lines of '{filename}' you may be able to refactor into \
         new function. The parameters and return values provided correspond with the new \
         function. Use your own discretion when determining if the decomposition is fit for you."
    );
    if !slow {
        print!(" For additional suggestions try using the flag --slow.");
    }
    println!("\n");

    for report in reports {
        for suggestion in &report.suggestions {
            println!(
                "{}: lines {}-{}, parameters: [{}], returns: [{}]",
                suggestion.function,
                suggestion.start_line,
                suggestion.end_line,
                suggestion.parameters.join(", "),
                suggestion.returns.join(", "),
            );
        }
    }
}

pub fn main() {
    let args = Args::parse();

    let source = std::fs::read_to_string(&args.filename)
        .unwrap_or_else(|e| panic!("could not read the input file {}: {e}", args.filename));

    let config = match &args.config {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| panic!("{e}")),
        None => Config::default(),
    };

    let program = front_end::parse(&source).unwrap_or_else(|e| panic!("syntax error: {e}"));
    print_linter_suggestions(&source, &program, args.debug);

    let num_funcs = program.functions.len();
    progress_bar(args.noprogress, 0, num_funcs);
    let reports = analyze(&source, &config, args.slow).unwrap_or_else(|e| panic!("{e}"));
    for (func_num, _) in reports.iter().enumerate() {
        progress_bar(args.noprogress, func_num + 1, num_funcs);
    }
    remove_progress_bar(args.noprogress);

    print_reports(&args.filename, &reports, args.slow);
}
