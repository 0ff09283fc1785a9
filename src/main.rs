mod app;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use genenet::{EngineConfig, LayoutKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Force,
    Fa2,
    None,
}

impl LayoutArg {
    fn kind(self) -> Option<LayoutKind> {
        match self {
            Self::Force => Some(LayoutKind::Force),
            Self::Fa2 => Some(LayoutKind::ForceAtlas2),
            Self::None => None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph document: `{"nodes": [{"ID": ...}], "edges": [{"source", "target", "score"}]}`.
    graph: PathBuf,

    /// JSON engine configuration; omitted keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Layout started once the graph is loaded.
    #[arg(long, value_enum, default_value = "fa2")]
    layout: LayoutArg,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genenet=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    info!(graph = %args.graph.display(), "starting viewer");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let graph_path = args.graph;
    let initial_layout = args.layout.kind();
    eframe::run_native(
        "genenet",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::GeneNetApp::new(
                cc,
                graph_path.clone(),
                config.clone(),
                initial_layout,
            )))
        }),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
