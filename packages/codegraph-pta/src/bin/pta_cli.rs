//! Pointer analysis CLI
//!
//! # Usage
//!
//! ```bash
//! # Full analysis with 2-limited call strings, dumping dot files
//! pta-cli run --scene scene.json --k 2 --dot-dump --out out/pta
//!
//! # Analysis rooted at specific methods, settings from YAML
//! pta-cli run --scene scene.json --config pta.yaml --entry Main.main
//!
//! # Direct call graph only
//! pta-cli callgraph --scene scene.json --rta
//! ```
//!
//! Logs go to stderr (`RUST_LOG` filters them); results go to stdout as JSON.

use clap::{Parser, Subcommand};
use codegraph_pta::{
    build_call_graph, default_entries, CallGraphKind, MethodSignature, PointerAnalysis, PtaConfig,
    Scene,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pta-cli")]
#[command(about = "Call graph and k-limited pointer analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pointer analysis to fixpoint
    Run {
        /// Scene JSON file
        #[arg(short, long)]
        scene: PathBuf,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Call-string bound (overrides config)
        #[arg(short, long)]
        k: Option<usize>,

        /// Entry method as Class.method (repeatable)
        #[arg(short, long)]
        entry: Vec<String>,

        /// Dump PAG and call graph dot files
        #[arg(long)]
        dot_dump: bool,

        /// Report locals whose pointees disagree with their declared class
        #[arg(long)]
        type_diff: bool,

        /// Output directory for dumps
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Build the direct (CHA / RTA) call graph
    Callgraph {
        /// Scene JSON file
        #[arg(short, long)]
        scene: PathBuf,

        /// Use rapid type analysis instead of CHA
        #[arg(long)]
        rta: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scene,
            config,
            k,
            entry,
            dot_dump,
            type_diff,
            out,
        } => {
            let mut cfg = match config {
                Some(path) => PtaConfig::from_yaml_file(path)?,
                None => PtaConfig::default(),
            };
            if let Some(k) = k {
                cfg = cfg.k_limit(k);
            }
            if dot_dump {
                cfg = cfg.dot_dump(true);
            }
            if type_diff {
                cfg = cfg.detect_type_diff(true);
            }
            if let Some(out) = out {
                cfg = cfg.output_dir(out);
            }
            run_analysis(scene, cfg, entry)?;
        }
        Commands::Callgraph { scene, rta } => {
            let kind = if rta {
                CallGraphKind::Rta
            } else {
                CallGraphKind::Cha
            };
            print_call_graph(scene, kind)?;
        }
    }

    Ok(())
}

fn parse_entries(entries: &[String]) -> Result<Vec<MethodSignature>, Box<dyn std::error::Error>> {
    let mut sigs = Vec::with_capacity(entries.len());
    for entry in entries {
        let sig = MethodSignature::parse(entry)
            .ok_or_else(|| format!("invalid entry '{}', expected Class.method", entry))?;
        sigs.push(sig);
    }
    Ok(sigs)
}

fn run_analysis(
    scene_path: PathBuf,
    config: PtaConfig,
    entries: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = Scene::from_json_file(&scene_path)?;
    let entries = parse_entries(&entries)?;
    let detect = config.detect_type_diff;

    let mut analysis = PointerAnalysis::new(&scene, config)?.with_entries(entries);
    let stats = analysis.run()?.clone();

    println!("{}", serde_json::to_string_pretty(&stats)?);
    if detect {
        println!("{}", serde_json::to_string_pretty(analysis.type_diffs())?);
    }
    Ok(())
}

fn print_call_graph(scene_path: PathBuf, kind: CallGraphKind) -> Result<(), Box<dyn std::error::Error>> {
    let scene = Scene::from_json_file(&scene_path)?;
    let entries = default_entries(&scene, kind);
    let cg = build_call_graph(&scene, &entries, kind);
    println!("{}", serde_json::to_string_pretty(&cg.edges())?);
    Ok(())
}
