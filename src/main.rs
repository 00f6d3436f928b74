use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use sna::cli::{self, LoadArgs};
use sna::{ComponentMode, ConnectivityReport, label_components, load_graph};

/// Count edges, vertices and weak/strong components of a directed edge list.
#[derive(Parser, Debug)]
#[command(name = "sna", version)]
struct Cli {
    /// Edge list, one `source<TAB>target` pair per line
    path: PathBuf,

    #[command(flatten)]
    load: LoadArgs,
}

fn main() -> ExitCode {
    cli::init_tracing();
    let args = Cli::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => cli::report(err),
    }
}

fn run(args: &Cli) -> Result<()> {
    let graph = load_graph(&args.path, &args.load.options())
        .with_context(|| format!("loading {}", args.path.display()))?;

    let weak = label_components(&graph, ComponentMode::Weak);
    let strong = label_components(&graph, ComponentMode::Strong);
    debug!(
        largest_wcc = weak.largest(),
        largest_scc = strong.largest(),
        "component sizes"
    );
    let report = ConnectivityReport::from_labels(&graph, &weak, &strong);

    println!("{report}");
    Ok(())
}
