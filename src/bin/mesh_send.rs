//! 加密消息投递仿真
//!
//! 构建网络（默认 10 节点环形拓扑），执行可选的拓扑管理操作，
//! 然后从 src 向 dst 发送一条消息并打印带时间戳的 trace。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use meshsim::config::{AdminOp, RoutingMode, SimConfig};
use meshsim::net::fmt_nodes;

#[derive(Debug, Parser)]
#[command(name = "mesh-send", about = "Simulate encrypted message delivery over a weighted mesh")]
struct Args {
    /// Path to a JSON config (engine, topology, admin ops)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Routing mode: dijkstra or aodv
    #[arg(long, env = "ROUTING_ALGO")]
    routing: Option<RoutingMode>,

    /// Reuse one session key per ordered (src, dst) pair (env accepts 1/true/yes)
    #[arg(
        long,
        env = "PERSIST_SESSIONS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    persist_sessions: bool,

    /// Number of ranked routes to compute per send
    #[arg(long)]
    top_k: Option<usize>,

    /// Add an edge: a,b,cost (repeatable)
    #[arg(long, value_parser = AdminOp::parse_add_edge)]
    add_edge: Vec<AdminOp>,

    /// Remove an edge: a,b (repeatable)
    #[arg(long, value_parser = AdminOp::parse_remove_edge)]
    remove_edge: Vec<AdminOp>,

    /// Take a node offline (repeatable)
    #[arg(long, value_parser = AdminOp::parse_offline)]
    offline: Vec<AdminOp>,

    /// Bring a node online: node:nbr=cost,nbr=cost (repeatable)
    #[arg(long, value_parser = AdminOp::parse_online)]
    online: Vec<AdminOp>,

    /// Source node
    #[arg(long, requires = "dst")]
    src: Option<usize>,

    /// Destination node
    #[arg(long, requires = "src")]
    dst: Option<usize>,

    /// Message text
    #[arg(long, default_value = "hello")]
    message: String,

    /// Print the topology snapshot as JSON
    #[arg(long)]
    dump_topology: bool,

    /// Print the send outcome as JSON instead of the trace
    #[arg(long)]
    json: bool,

    /// Write the timestamped trace to this file
    #[arg(long)]
    log_out: Option<PathBuf>,
}

fn main() -> ExitCode {
    // 初始化 tracing（输出到 stderr，stdout 留给结果）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
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
    if args.persist_sessions {
        cfg.engine.persist_sessions = true;
    }
    if let Some(k) = args.top_k {
        cfg.engine.top_k = k;
    }
    cfg.admin.extend(
        args.add_edge
            .into_iter()
            .chain(args.remove_edge)
            .chain(args.offline)
            .chain(args.online),
    );

    let engine = cfg.build_engine()?;

    if args.dump_topology {
        println!("{}", serde_json::to_string_pretty(&engine.snapshot_topology())?);
    }

    let (Some(src), Some(dst)) = (args.src, args.dst) else {
        return Ok(());
    };

    let outcome = engine.send_message(src, dst, args.message.trim())?;

    // 时间戳由调用方添加，同一次发送的所有行共用一个时间戳
    let stamp = timestamp();
    let lines: Vec<String> = outcome
        .trace
        .iter()
        .map(|line| format!("{stamp}  {line}"))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let engine_cfg = engine.config();
        println!(
            "routing={} persist_sessions={} status={:?} route={} cost={}",
            engine_cfg.routing,
            engine_cfg.persist_sessions,
            outcome.status,
            fmt_nodes(&outcome.route),
            outcome.cost
        );
        for line in &lines {
            println!("{line}");
        }
        match &outcome.decrypted {
            Some(text) => println!("decrypted={text}"),
            None => println!("decrypted=<none>"),
        }
    }

    if let Some(path) = &args.log_out {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, lines.join("\n"))?;
        eprintln!("wrote trace log to {}", path.display());
    }
    Ok(())
}

/// 本地时间，ISO 8601（微秒精度）
fn timestamp() -> String {
    chrono::Local::now()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
