//! `slicer`: reads a trace file, slices it against the final instruction's
//! reads, and writes the reduced trace in two forms.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trace_analysis::{backward_slice, build_parameters, parse_trace, render_human_line, render_llse_line};

/// Compute a backward program slice of an execution trace.
#[derive(Parser, Debug)]
#[command(name = "slicer", about = "Backward-slice an x86-64 execution trace")]
struct Cli {
    /// Path to the input trace file (one instruction per line).
    trace_file: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(&cli.trace_file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("slicer: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(trace_file: &PathBuf) -> Result<(), String> {
    let text = fs::read_to_string(trace_file)
        .map_err(|e| format!("reading {}: {e}", trace_file.display()))?;

    let (mut instructions, parse_diags) = parse_trace(&text);
    for diag in &parse_diags {
        tracing::warn!(%diag, "trace line skipped during parse");
    }
    if instructions.is_empty() {
        return Err("no instructions parsed from trace".to_string());
    }

    let build_diags = build_parameters(&mut instructions);
    for diag in &build_diags {
        tracing::warn!(%diag, "instruction has no recognised parameter shape");
    }

    let slice = backward_slice(&instructions).ok_or_else(|| "empty instruction list".to_string())?;

    let human: String = slice
        .instructions
        .iter()
        .map(|inst| render_human_line(inst))
        .collect::<Vec<_>>()
        .join("\n");
    fs::write("slice.human.trace", human + "\n")
        .map_err(|e| format!("writing slice.human.trace: {e}"))?;

    let llse: String = slice
        .instructions
        .iter()
        .map(|inst| render_llse_line(inst))
        .collect::<Vec<_>>()
        .join("\n");
    fs::write("slice.llse.trace", llse + "\n")
        .map_err(|e| format!("writing slice.llse.trace: {e}"))?;

    tracing::info!(
        kept = slice.instructions.len(),
        total = instructions.len(),
        residual = slice.residual.len(),
        "slice complete"
    );

    Ok(())
}
