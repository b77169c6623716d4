use std::{
    io::{BufWriter, Write},
    process::ExitCode,
};

use anyhow::Context;
use maligned::{gosrc::GoSource, *};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Finds structs whose fields could be ordered to take less memory
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Go files, or directories holding one package each
    #[arg(required = true, value_parser = clap::value_parser!(PathBuf))]
    paths:      Vec<PathBuf>,

    /// Target machine (amd64, 386, arm64, ...). Defaults to $GOARCH,
    /// then amd64
    #[arg(short, long)]
    arch:       Option<String>,

    /// Only report wasted space, not pointer-bearing prefixes
    #[arg(long, default_value_t = false)]
    sizes_only: bool,

    /// Print the suggested field order under each finding
    #[arg(short, long, default_value_t = false)]
    order:      bool,

    /// Worker threads (0 picks one per core)
    #[arg(short, long, default_value_t = 0)]
    #[arg(value_parser = clap::value_parser!(usize))]
    jobs:       usize,
}

// Exit statuses.
const FATAL: u8 = 1;
const FOUND: u8 = 3;
const SKIPPED: u8 = 1;

fn main() -> ExitCode {
    let cli = Args::parse();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("maligned: {e:#}");
            ExitCode::from(FATAL)
        },
    }
}

fn run(cli: Args) -> anyhow::Result<ExitCode> {
    let arch = cli.arch
        .or_else(|| std::env::var("GOARCH").ok().filter(|a| !a.is_empty()))
        .unwrap_or_else(|| Profile::Amd64.name().to_string());
    let abi = AbiParams::for_profile(&arch)?;
    let sizes = if cli.sizes_only { Sizes::sizes_only(abi) } else { Sizes::new(abi) };
    info!(%arch, word_size = abi.word_size(), max_align = abi.max_align(), "Target selected.");

    if cli.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.jobs)
            .build_global()
            .context("setting up the worker pool")?;
    }

    // Everything is read before anything is reported: a broken input
    // is fatal, not a partial result.
    let mut records = vec![];
    for path in &cli.paths {
        let src = GoSource::open(path)?;
        records.extend(src.records(&sizes)?);
    }

    let outcomes = algo::analyze_all(&records, &sizes);

    let mut out = BufWriter::new(std::io::stdout().lock());
    let (mut found, mut skipped) = (0_usize, 0_usize);
    for outcome in outcomes {
        match outcome {
            Ok(diags) => {
                for d in diags {
                    found += 1;
                    writeln!(out, "{}", describe(&d))?;
                    if cli.order {
                        writeln!(out, "\tsuggested order: {}", d.suggested.iter().join(", "))?;
                    }
                }
            },
            Err((pos, e)) => {
                skipped += 1;
                eprintln!("{pos}: cannot analyze struct: {e}");
            },
        }
    }
    out.flush()?;
    info!(records = records.len(), found, skipped, "Done.");

    Ok(if found > 0 {
        ExitCode::from(FOUND)
    } else if skipped > 0 {
        ExitCode::from(SKIPPED)
    } else {
        ExitCode::SUCCESS
    })
}

fn describe(d: &Diagnostic<SourcePos>) -> String {
    let (actual, optimal) = d.compared();
    match d.kind {
        DiagnosticKind::Size            => {
            format!("{}: struct of size {actual} could be {optimal}", d.position)
        },
        DiagnosticKind::PointerBytes    => {
            format!("{}: struct with {actual} pointer bytes could be {optimal}", d.position)
        },
    }
}
