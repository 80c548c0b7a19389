//! 路由诊断
//!
//! 在（可配置的）拓扑上查询 src→dst 的路由：按当前模式的一条路由、
//! 贪心 top-K，或所有简单路径。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use meshsim::config::{RoutingMode, SimConfig};
use meshsim::net::{NetworkEngine, fmt_nodes};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Query {
    /// One route under the configured routing mode
    Route,
    /// Greedy edge-disjoint top-K routes
    TopK,
    /// Every simple path
    All,
}

#[derive(Debug, Parser)]
#[command(name = "mesh-paths", about = "Route diagnostics for the mesh topology")]
struct Args {
    /// Path to a JSON config (engine, topology, admin ops)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Routing mode used by `--query route`: dijkstra or aodv
    #[arg(long, env = "ROUTING_ALGO")]
    routing: Option<RoutingMode>,

    #[arg(long, value_enum, default_value_t = Query::TopK)]
    query: Query,

    #[arg(long, default_value_t = 3)]
    k: usize,

    #[arg(long)]
    src: usize,

    #[arg(long)]
    dst: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|e| format!("read {}: {e}", path.display()))?;
            serde_json::from_str::<SimConfig>(&raw)
                .map_err(|e| format!("parse config {}: {e}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(routing) = args.routing {
        cfg.engine.routing = routing;
    }
    let engine: NetworkEngine = cfg.build_engine()?;

    match args.query {
        Query::Route => match engine.find_route(args.src, args.dst)? {
            Some(route) => println!(
                "route[{}] {} cost={}",
                engine.routing_mode(),
                fmt_nodes(&route.nodes),
                route.cost
            ),
            None => println!("no route from {} to {}", args.src, args.dst),
        },
        Query::TopK => {
            let routes = engine.top_k_routes(args.src, args.dst, args.k)?;
            println!("top_k k={} found={}", args.k, routes.len());
            for (idx, route) in routes.iter().enumerate() {
                println!("path {} {} cost={}", idx + 1, fmt_nodes(&route.nodes), route.cost);
            }
        }
        Query::All => {
            let paths = engine.find_all_paths(args.src, args.dst)?;
            println!("all_paths found={}", paths.len());
            for path in &paths {
                println!("path {}", fmt_nodes(path));
            }
        }
    }
    Ok(())
}
