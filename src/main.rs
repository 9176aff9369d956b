use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use figlang::analysis::{analyze, suggest};
use figlang::diagnostics;
use figlang::parser::parse_source;
use figlang::runtime::{persistence, EvaluatorConfig, FigEvaluator};

/// figlang runs programs written in FigLang, an English-like scripting
/// language with reactive variables.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Program to run, usually a `.fig` file.
    file: PathBuf,

    /// Makes certainty checks and random expressions repeatable.
    #[arg(long)]
    seed: Option<u64>,

    /// Where `remember` stores its files (overrides FIGLANG_MEMORY_DIR).
    #[arg(long)]
    memory_dir: Option<PathBuf>,

    /// Skips the warnings printed before the program runs.
    #[arg(long)]
    no_warnings: bool,
}

fn emit(lines: &[String]) -> Result<()> {
    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{}", line).context("writing to stdout")?;
    }
    out.flush().context("flushing stdout")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let source = match persistence::read_text(&args.file) {
        Ok(source) => source,
        Err(err) => return emit(&diagnostics::report(&err, None, &[])),
    };

    let hints = suggest(&source);
    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(err) => return emit(&diagnostics::report(&err, None, &hints)),
    };

    if !args.no_warnings {
        let warnings = analyze(&program, &source);
        if !warnings.is_empty() {
            let mut lines = vec![String::new()];
            lines.extend(warnings.iter().map(|w| format!("  [!] {}", w)));
            lines.push(String::new());
            emit(&lines)?;
        }
    }

    let mut config = EvaluatorConfig::from_env();
    if let Some(dir) = args.memory_dir {
        config.memory_dir = dir;
    }
    let source_dir = args
        .file
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut evaluator = FigEvaluator::new()
        .with_config(config)
        .with_source_dir(source_dir);
    if let Some(seed) = args.seed {
        evaluator = evaluator.with_seed(seed);
    }

    if let Err(err) = evaluator.run(&program) {
        emit(&diagnostics::report(&err, Some(&evaluator), &[]))?;
    }
    Ok(())
}
