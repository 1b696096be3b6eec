use clap::Parser as CParser;
use log::error;

use rpal::{
    flattener::{Flattener, OptimizedFlattener},
    lexer::Lexer,
    machine::Machine,
    parser,
    standardizer::standardize,
};

#[derive(CParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the source file.
    file: std::path::PathBuf,

    /// Print the raw abstract syntax tree.
    #[arg(long)]
    ast: bool,

    /// Print the standardized tree.
    #[arg(long)]
    st: bool,

    /// Print the standard flattened control structures.
    #[arg(long)]
    flat: bool,

    /// Print the optimized flattened control structures.
    #[arg(long)]
    optflat: bool,

    /// Print the step-by-step execution trace.
    #[arg(long)]
    cse: bool,

    /// Print both the raw and the standardized tree.
    #[arg(long)]
    allt: bool,
}

/// The documented flag spellings are single-dash (`-ast`, `-st`, ...);
/// clap only knows the double-dash form, so rewrite them before parsing.
fn normalize_flags(args: impl Iterator<Item = String>) -> impl Iterator<Item = String> {
    args.map(|arg| match arg.as_str() {
        "-ast" => "--ast".into(),
        "-st" => "--st".into(),
        "-flat" => "--flat".into(),
        "-optflat" => "--optflat".into(),
        "-cse" => "--cse".into(),
        "-allt" => "--allt".into(),
        _ => arg,
    })
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse_from(normalize_flags(std::env::args()));

    let Ok(source) = std::fs::read_to_string(&args.file) else {
        error!("Could not read file: '{}'", args.file.to_string_lossy());
        std::process::exit(1);
    };

    let tokens = match Lexer::new(&source).lex() {
        Ok(tokens) => tokens,
        Err(lex_error) => {
            error!("{lex_error}");
            std::process::exit(-1);
        }
    };

    let ast = match parser::parse(tokens) {
        Ok(ast) => ast,
        Err(parse_error) => {
            error!("{parse_error}");
            std::process::exit(-1);
        }
    };

    let st = match standardize(&ast) {
        Ok(st) => st,
        Err(standardize_error) => {
            error!("{standardize_error}");
            std::process::exit(-1);
        }
    };

    if args.ast || args.allt {
        print!("{}", ast.tree());
    }
    if args.st || args.allt {
        print!("{}", st.tree());
    }

    if args.flat {
        print!("{}", Flattener::new().flatten(&st));
    }

    let structures = OptimizedFlattener::new().flatten(&st);
    if args.optflat {
        print!("{structures}");
    }

    let mut machine = Machine::new(structures);
    machine.record_trace(args.cse);

    match machine.run() {
        Ok(_) => {
            println!();
            if args.cse {
                print!("{}", machine.render_trace());
            }
        }
        Err(runtime_error) => {
            error!("{runtime_error}");
            std::process::exit(-1);
        }
    }
}
