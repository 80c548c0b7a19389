use chrono::NaiveDateTime;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "meshsim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn mesh_send(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mesh_send"))
        .env_remove("ROUTING_ALGO")
        .env_remove("PERSIST_SESSIONS")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("run mesh_send")
}

#[test]
fn mesh_send_delivers_over_direct_edge_as_json() {
    let output = mesh_send(&["--src", "0", "--dst", "9", "--message", "hello", "--json"]);
    assert!(
        output.status.success(),
        "mesh_send failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let outcome: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(outcome["status"], "delivered");
    assert_eq!(outcome["route"], serde_json::json!([0, 9]));
    assert_eq!(outcome["cost"], 5);
    assert_eq!(outcome["decrypted"], "hello");
}

#[test]
fn mesh_send_prints_timestamped_trace_and_writes_log() {
    let dir = unique_temp_dir("log-out");
    let log = dir.join("logs").join("log.txt");
    let output = mesh_send(&[
        "--src",
        "0",
        "--dst",
        "9",
        "--log-out",
        log.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("routing=dijkstra persist_sessions=false status=Delivered route=[0, 9] cost=5"));
    assert!(stdout.contains("decrypted=hello"));

    let written = fs::read_to_string(&log).expect("read log file");
    let lines: Vec<&str> = written.lines().collect();
    assert!(lines.len() >= 5, "unexpected log: {written}");
    for line in &lines {
        let (stamp, _) = line.split_once("  ").expect("timestamp separator");
        assert!(
            NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f").is_ok(),
            "bad timestamp in {line}"
        );
    }
    assert!(lines.last().unwrap().ends_with("Decrypted at Node 9: hello"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn mesh_send_reports_no_route_after_admin_ops() {
    let output = mesh_send(&["--offline", "9", "--src", "0", "--dst", "9", "--json"]);
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["status"], "no_route");
    assert_eq!(outcome["route"], serde_json::json!([]));
    assert!(outcome["decrypted"].is_null());
    assert_eq!(outcome["trace"][0], "No paths found from Node 0 to Node 9.");
}

#[test]
fn mesh_send_applies_add_edge_and_online() {
    let output = mesh_send(&[
        "--add-edge",
        "0,5,1",
        "--offline",
        "4",
        "--online",
        "4:3=6",
        "--dump-topology",
    ]);
    assert!(output.status.success());
    let snap: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snap["node_count"], 10);
    let edges = snap["edges"].as_array().unwrap();
    assert!(edges.contains(&serde_json::json!({ "from": 0, "to": 5, "cost": 1 })));
    assert!(edges.contains(&serde_json::json!({ "from": 3, "to": 4, "cost": 6 })));
    assert!(!edges.iter().any(|e| e["from"] == 4 && e["to"] == 5));
}

#[test]
fn mesh_send_uses_config_file() {
    let dir = unique_temp_dir("config");
    let cfg = dir.join("mesh.json");
    fs::write(
        &cfg,
        r#"
{
    "engine": { "routing": "aodv", "persist_sessions": true },
    "topology": { "kind": "matrix", "matrix": [
        [0, 1, 0, 10],
        [1, 0, 1, 0],
        [0, 1, 0, 1],
        [10, 0, 1, 0]
    ] }
}
        "#,
    )
    .unwrap();

    let output = mesh_send(&[
        "--config",
        cfg.to_str().unwrap(),
        "--src",
        "0",
        "--dst",
        "3",
        "--message",
        "via flood",
        "--json",
    ]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["route"], serde_json::json!([0, 3]));
    assert_eq!(outcome["decrypted"], "via flood");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn mesh_send_exits_nonzero_on_invalid_node() {
    let output = mesh_send(&["--src", "0", "--dst", "10"]);
    assert!(!output.status.success(), "expected non-zero exit");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("invalid node 10"),
        "stderr did not contain expected message: {stderr}"
    );
}

#[test]
fn mesh_send_exits_nonzero_on_invalid_edge_cost() {
    let output = mesh_send(&["--add-edge", "0,5,0", "--dump-topology"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("edge cost must be positive"), "stderr={stderr}");
}

#[test]
fn mesh_send_reads_boolish_persist_sessions_env() {
    for value in ["1", "yes", "true"] {
        let output = Command::new(env!("CARGO_BIN_EXE_mesh_send"))
            .env_remove("ROUTING_ALGO")
            .env("PERSIST_SESSIONS", value)
            .env("RUST_LOG", "warn")
            .args(["--src", "1", "--dst", "6"])
            .output()
            .expect("run mesh_send");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(output.status.success(), "PERSIST_SESSIONS={value} stderr={stderr}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("persist_sessions=true"),
            "PERSIST_SESSIONS={value} stdout={stdout}"
        );
    }

    let output = Command::new(env!("CARGO_BIN_EXE_mesh_send"))
        .env_remove("ROUTING_ALGO")
        .env("PERSIST_SESSIONS", "0")
        .env("RUST_LOG", "warn")
        .args(["--src", "1", "--dst", "6"])
        .output()
        .expect("run mesh_send");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("persist_sessions=false"));
}

#[test]
fn mesh_send_rejects_oversized_edge_cost() {
    let output = mesh_send(&["--add-edge", "0,5,9223372036854775807", "--dump-topology"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exceeds maximum"), "stderr={stderr}");
}

#[test]
fn mesh_paths_lists_all_simple_paths() {
    let output = Command::new(env!("CARGO_BIN_EXE_mesh_paths"))
        .env_remove("ROUTING_ALGO")
        .args(["--query", "all", "--src", "0", "--dst", "9"])
        .output()
        .expect("run mesh_paths");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("all_paths found=2"));
    assert!(stdout.contains("path [0, 9]"));
    assert!(stdout.contains("path [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]"));
}

#[test]
fn mesh_paths_top_k_and_flood_route() {
    let output = Command::new(env!("CARGO_BIN_EXE_mesh_paths"))
        .env_remove("ROUTING_ALGO")
        .args(["--query", "top-k", "--k", "3", "--src", "0", "--dst", "9"])
        .output()
        .expect("run mesh_paths");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("top_k k=3 found=2"));
    assert!(stdout.contains("path 1 [0, 9] cost=5"));

    let output = Command::new(env!("CARGO_BIN_EXE_mesh_paths"))
        .env("ROUTING_ALGO", "aodv")
        .args(["--query", "route", "--src", "0", "--dst", "6"])
        .output()
        .expect("run mesh_paths");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("route[aodv] [0, 9, 8, 7, 6] cost=24"), "stdout={stdout}");
}
