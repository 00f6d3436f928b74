use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tracing::{debug, info, warn};

use sna::cli::{self, LoadArgs};
use sna::{
    DrawConfig, FitConfig, FitEvent, Layout, PriceConfig, draw_hierarchy, load_graph,
    minimize_nested_blockmodel_dl, price_network,
};

/// Fit a nested stochastic block model to an edge list and draw the hierarchy.
#[derive(Parser, Debug)]
#[command(name = "sna-vis", version)]
struct Cli {
    /// Edge list, one `source<TAB>target` pair per line
    #[arg(required_unless_present = "price")]
    path: Option<PathBuf>,

    #[command(flatten)]
    load: LoadArgs,

    /// Rendered file; the extension selects pdf, png, svg or ps
    #[arg(long, default_value = "medium.pdf", env = "SNA_OUTPUT")]
    output: PathBuf,

    /// Graphviz layout engine
    #[arg(long, value_enum, default_value_t = Layout::Sfdp)]
    layout: Layout,

    #[arg(long, env = "SNA_SEED")]
    seed: Option<u64>,

    /// Independent fits; the shortest description wins
    #[arg(long, default_value_t = 4)]
    restarts: usize,

    /// Fit without degree correction
    #[arg(long)]
    no_deg_corr: bool,

    /// Fit a generated Price network with this many vertices instead of a file
    #[arg(long, conflicts_with = "path")]
    price: Option<usize>,
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
    // one seed drives both the generator and the fit
    let seed = args.seed.unwrap_or_else(rand::random);
    debug!(seed, "resolved seed");

    let graph = match (&args.path, args.price) {
        (_, Some(nodes)) => price_network(&PriceConfig {
            nodes,
            seed,
            ..PriceConfig::default()
        }),
        (Some(path), None) => load_graph(path, &args.load.options())
            .with_context(|| format!("loading {}", path.display()))?,
        (None, None) => bail!("an edge list path or --price is required"),
    };
    info!(
        vertices = graph.num_vertices(),
        edges = graph.num_edges(),
        "fitting nested block model"
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    let logger = thread::spawn(move || {
        for event in rx {
            match event {
                FitEvent::LevelFinished { restart, level, blocks } => {
                    info!(restart, level, blocks, "level fitted");
                }
                FitEvent::RestartFinished {
                    restart,
                    description_length,
                } => {
                    info!(restart, description_length, "restart finished");
                }
                other => debug!(?other, "fit progress"),
            }
        }
    });

    let config = FitConfig {
        degree_corrected: !args.no_deg_corr,
        restarts: args.restarts,
        seed: Some(seed),
        events: Some(tx),
        ..FitConfig::default()
    };
    let fitted = minimize_nested_blockmodel_dl(&graph, &config);
    drop(config);
    if logger.join().is_err() {
        warn!("progress logger panicked; some fit events were not logged");
    }
    let hierarchy = fitted.context("fitting block model")?;

    info!(
        depth = hierarchy.depth(),
        blocks = hierarchy.blocks(0),
        description_length = hierarchy.description_length,
        "drawing"
    );
    draw_hierarchy(
        &graph,
        &hierarchy,
        &DrawConfig {
            layout: args.layout,
            output: args.output.clone(),
        },
    )
    .context("rendering hierarchy")?;
    Ok(())
}
