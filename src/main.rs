//! Headless CLI: compile a graph document to kernel source, optionally run
//! the pipeline against the recording dispatch.

use anyhow::{Context, Result, bail};

use texture_forge::processor::GraphProcessor;
use texture_forge::{Graph, RecordingDispatch};

struct Args {
    graph: String,
    emit: Option<String>,
    execute: bool,
}

fn parse_args() -> Result<Args> {
    let mut graph = None;
    let mut emit = None;
    let mut execute = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--graph" => graph = Some(it.next().context("--graph requires a file path")?),
            "--emit" => emit = Some(it.next().context("--emit requires a file path")?),
            "--execute" => execute = true,
            "--help" | "-h" => {
                println!(
                    "usage: texture-forge --graph <file.json> [--emit <out.hlsl>] [--execute]"
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument '{other}' (try --help)"),
        }
    }

    let Some(graph) = graph else {
        bail!("--graph <file.json> is required (try --help)");
    };
    Ok(Args {
        graph,
        emit,
        execute,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;

    let graph = Graph::load_from_path(&args.graph)?;
    let mut processor = GraphProcessor::new(graph).context("failed to prepare graph")?;
    processor.build_graph().context("graph validation failed")?;

    if args.execute {
        let mut dispatch = RecordingDispatch::new();
        let report = processor
            .execute_graph(&mut dispatch)
            .context("graph execution failed")?;
        for sink in &report.succeeded {
            println!("ok: {sink}");
        }
        for (sink, detail) in &report.failed {
            eprintln!("failed: {sink}: {detail}");
        }
        if let Some(path) = &args.emit {
            std::fs::write(path, &report.kernel_source)
                .with_context(|| format!("failed to write {path}"))?;
        }
        if !report.failed.is_empty() {
            bail!("{} sink(s) failed", report.failed.len());
        }
    } else {
        let source = processor
            .generate_code_only()
            .context("code generation failed")?;
        match &args.emit {
            Some(path) => std::fs::write(path, &source)
                .with_context(|| format!("failed to write {path}"))?,
            None => print!("{source}"),
        }
    }

    Ok(())
}
