//! 网络引擎
//!
//! 持有拓扑与会话密钥，回答“从 src 向 dst 发送消息”：计算路由、获取会话密钥、
//! 在源节点加密一次、逐跳记录转发、在目的节点解密，并返回结构化结果。
//!
//! 拓扑由一把读写锁保护：管理操作持写锁，发送与路径查询在整个路由计算期间持读锁，
//! 因此不会看到只改了一半的拓扑。会话密钥表有自己的互斥锁。

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{NetError, NetResult};
use super::id::{NodeId, fmt_nodes};
use super::routing::{self, Route};
use super::topology::{Topology, TopologySnapshot};
use crate::config::{EngineConfig, RoutingMode};
use crate::crypto::{EncryptedMessage, SessionCipher, SessionKeyManager};
use crate::topo::default_ring;

/// 一次发送的终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// src == dst，不加密直接“送达”
    SameNode,
    /// 找不到任何路由
    NoRoute,
    /// 目的节点解密成功
    Delivered,
    /// 目的节点解密失败（不是引擎错误）
    DeliveryFailed,
    /// 路由后的流程出现意外错误，已转为一行 trace
    Aborted,
}

/// 一次发送的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub route: Vec<NodeId>,
    /// 所选路由的总代价（无路由或同节点时为 0）
    pub cost: u64,
    /// 不带时间戳的人类可读日志行
    pub trace: Vec<String>,
    pub decrypted: Option<String>,
    pub status: DeliveryStatus,
}

/// 网络引擎
#[derive(Debug)]
pub struct NetworkEngine {
    topology: RwLock<Topology>,
    sessions: SessionKeyManager,
    config: EngineConfig,
}

impl Default for NetworkEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl NetworkEngine {
    /// 使用默认 10 节点环形拓扑
    pub fn new(config: EngineConfig) -> Self {
        Self::with_topology(default_ring(), config)
    }

    pub fn with_topology(topology: Topology, config: EngineConfig) -> Self {
        info!(
            nodes = topology.size(),
            routing = %config.routing,
            persist_sessions = config.persist_sessions,
            top_k = config.top_k,
            "🕸️  创建网络引擎"
        );
        Self {
            topology: RwLock::new(topology),
            sessions: SessionKeyManager::new(),
            config,
        }
    }

    pub fn node_count(&self) -> usize {
        self.topology.read().size()
    }

    pub fn routing_mode(&self) -> RoutingMode {
        self.config.routing
    }

    pub fn persist_sessions(&self) -> bool {
        self.config.persist_sessions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionKeyManager {
        &self.sessions
    }

    /// 拓扑快照（每条无向链路一次）
    pub fn snapshot_topology(&self) -> TopologySnapshot {
        self.topology.read().snapshot()
    }

    /// 复制一份当前拓扑
    pub fn topology(&self) -> Topology {
        self.topology.read().clone()
    }

    // ---- 管理操作 ----

    #[tracing::instrument(skip(self))]
    pub fn add_edge(&self, a: usize, b: usize, cost: i64) -> NetResult<()> {
        let res = self.topology.write().add_edge(a, b, cost);
        log_admin("add_edge", &res);
        res
    }

    #[tracing::instrument(skip(self))]
    pub fn remove_edge(&self, a: usize, b: usize) -> NetResult<()> {
        let res = self.topology.write().remove_edge(a, b);
        log_admin("remove_edge", &res);
        res
    }

    #[tracing::instrument(skip(self))]
    pub fn set_node_offline(&self, node: usize) -> NetResult<()> {
        let res = self.topology.write().set_node_offline(node);
        log_admin("set_node_offline", &res);
        res
    }

    #[tracing::instrument(skip(self))]
    pub fn set_node_online(&self, node: usize, neighbors: &BTreeMap<usize, i64>) -> NetResult<()> {
        let res = self.topology.write().set_node_online(node, neighbors);
        log_admin("set_node_online", &res);
        res
    }

    // ---- 路径查询 ----

    /// 按当前路由模式计算一条路由
    pub fn find_route(&self, src: usize, dst: usize) -> NetResult<Option<Route>> {
        let topo = self.topology.read();
        let src = topo.check_node(src)?;
        let dst = topo.check_node(dst)?;
        let route = match self.config.routing {
            RoutingMode::ShortestPath => {
                routing::shortest_path_excluding(&topo, src, dst, &routing::EdgeExclusion::new())
            }
            RoutingMode::Flood => routing::flood_route(&topo, src, dst).and_then(|nodes| {
                let cost = topo.route_cost(&nodes)?;
                Some(Route { nodes, cost })
            }),
        };
        Ok(route)
    }

    pub fn top_k_routes(&self, src: usize, dst: usize, k: usize) -> NetResult<Vec<Route>> {
        let topo = self.topology.read();
        let src = topo.check_node(src)?;
        let dst = topo.check_node(dst)?;
        Ok(routing::top_k_routes(&topo, src, dst, k))
    }

    pub fn find_all_paths(&self, start: usize, end: usize) -> NetResult<Vec<Vec<NodeId>>> {
        let topo = self.topology.read();
        let start = topo.check_node(start)?;
        let end = topo.check_node(end)?;
        Ok(routing::all_simple_paths(&topo, start, end))
    }

    // ---- 发送 ----

    /// 模拟一次端到端加密投递。
    ///
    /// 只有端点越界会返回错误；无路由、解密失败等都作为 [`DeliveryStatus`] 返回。
    #[tracing::instrument(skip(self, message), fields(msg_len = message.len()))]
    pub fn send_message(&self, src: usize, dst: usize, message: &str) -> NetResult<SendOutcome> {
        let topo = self.topology.read();
        let size = topo.size();
        let src = endpoint(src, size)?;
        let dst = endpoint(dst, size)?;

        if src == dst {
            info!("源与目的相同，无需加密");
            return Ok(SendOutcome {
                route: vec![src],
                cost: 0,
                trace: vec![format!(
                    "Source and destination are same (Node {src})."
                )],
                decrypted: Some(message.to_string()),
                status: DeliveryStatus::SameNode,
            });
        }

        let mut trace = Vec::new();
        let ranked = routing::top_k_routes(&topo, src, dst, self.config.top_k.max(1));
        let Some(best) = ranked.first() else {
            warn!("❌ 无可用路由");
            trace.push(format!("No paths found from Node {src} to Node {dst}."));
            return Ok(SendOutcome {
                route: Vec::new(),
                cost: 0,
                trace,
                decrypted: None,
                status: DeliveryStatus::NoRoute,
            });
        };

        trace.push(format!(
            "Top {} shortest paths from Node {src} to Node {dst}:",
            ranked.len()
        ));
        for (idx, r) in ranked.iter().enumerate() {
            trace.push(format!(
                "  Path {}: {} with cost {}",
                idx + 1,
                fmt_nodes(&r.nodes),
                r.cost
            ));
        }

        let path = match self.config.routing {
            RoutingMode::ShortestPath => best.nodes.clone(),
            RoutingMode::Flood => {
                // 与 top-K 使用同一快照，连通性一致
                let flooded = routing::flood_route(&topo, src, dst)
                    .unwrap_or_else(|| best.nodes.clone());
                trace.push(format!(
                    "Flood route discovery selected path {}",
                    fmt_nodes(&flooded)
                ));
                flooded
            }
        };
        let hops: Vec<(NodeId, NodeId, u64)> = path
            .windows(2)
            .map(|hop| (hop[0], hop[1], topo.cost(hop[0], hop[1])))
            .collect();
        drop(topo);

        // 每跳代价不超过 MAX_LINK_COST，总和不会溢出
        let cost: u64 = hops.iter().map(|&(_, _, c)| c).sum();
        debug!(route = %fmt_nodes(&path), cost, "选定传输路径");

        let result = self.transmit(src, dst, message, &hops, &mut trace);
        let (decrypted, status) = settle(result, &mut trace);

        Ok(SendOutcome {
            route: path,
            cost,
            trace,
            decrypted,
            status,
        })
    }

    /// 源节点加密一次，逐跳记录转发，目的节点解密。
    fn transmit(
        &self,
        src: NodeId,
        dst: NodeId,
        message: &str,
        hops: &[(NodeId, NodeId, u64)],
        trace: &mut Vec<String>,
    ) -> NetResult<Option<String>> {
        let key = self
            .sessions
            .get_or_create_key(src, dst, self.config.persist_sessions);
        let cipher = SessionCipher::new(key.as_bytes())?;
        let encrypted = cipher.encrypt(message)?;

        trace.push(format!(
            "Session key (hex) for {src}->{dst}: {}",
            key.to_hex()
        ));
        trace.push(format!(
            "Encrypted at Node {src}: ciphertext(hex)={} iv(hex)={}",
            hex::encode(&encrypted.ciphertext),
            hex::encode(encrypted.iv)
        ));
        for &(from, to, cost) in hops {
            trace.push(format!("Forwarded from Node {from} → Node {to} (cost={cost})"));
        }

        let dst_cipher = SessionCipher::new(key.as_bytes())?;
        Ok(decrypt_at_destination(dst, &dst_cipher, &encrypted, trace))
    }
}

/// 把传输结果归结为终止状态；意外错误记为一行 `Error: {kind}: {message}`。
pub(crate) fn settle(
    result: NetResult<Option<String>>,
    trace: &mut Vec<String>,
) -> (Option<String>, DeliveryStatus) {
    match result {
        Ok(Some(text)) => {
            info!("✅ 消息已送达并解密");
            (Some(text), DeliveryStatus::Delivered)
        }
        Ok(None) => (None, DeliveryStatus::DeliveryFailed),
        Err(e) => {
            warn!(error = %e, "发送流程中断");
            trace.push(format!("Error: {}: {}", e.kind(), e));
            (None, DeliveryStatus::Aborted)
        }
    }
}

/// 目的节点解密；失败时记录一行 trace 并返回 None。
pub(crate) fn decrypt_at_destination(
    dst: NodeId,
    cipher: &SessionCipher,
    encrypted: &EncryptedMessage,
    trace: &mut Vec<String>,
) -> Option<String> {
    match cipher.decrypt(encrypted) {
        Ok(text) => {
            trace.push(format!("Decrypted at Node {dst}: {text}"));
            Some(text)
        }
        Err(e) => {
            warn!(dst = %dst, error = %e, "目的节点解密失败");
            trace.push(format!("Decryption failed at Node {dst}: {}: {e}", e.kind()));
            None
        }
    }
}

fn endpoint(node: usize, size: usize) -> NetResult<NodeId> {
    if node < size {
        Ok(NodeId(node))
    } else {
        Err(NetError::InvalidNode { node, size })
    }
}

fn log_admin(op: &str, res: &NetResult<()>) {
    match res {
        Ok(()) => info!(op, "拓扑已更新"),
        Err(e) => warn!(op, error = %e, "拒绝拓扑操作"),
    }
}
