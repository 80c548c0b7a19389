//! 引擎与拓扑配置
//!
//! 路由模式与会话持久化在构造引擎时确定，不是每次调用的参数。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::net::{NetResult, NetworkEngine, Topology};
use crate::topo::default_ring;

/// 默认 top-K 中的 K
pub const DEFAULT_TOP_K: usize = 3;

/// 路由模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// 按代价的 Dijkstra 最短路径
    #[default]
    #[serde(alias = "dijkstra")]
    ShortestPath,
    /// 类 AODV 的洪泛发现（按跳数）
    #[serde(alias = "aodv")]
    Flood,
}

impl RoutingMode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "shortest_path" | "shortest-path" | "dijkstra" => Ok(RoutingMode::ShortestPath),
            "flood" | "aodv" => Ok(RoutingMode::Flood),
            other => Err(format!(
                "unknown routing mode '{other}' (expected dijkstra or aodv)"
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMode::ShortestPath => "dijkstra",
            RoutingMode::Flood => "aodv",
        }
    }
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 网络引擎配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub routing: RoutingMode,
    #[serde(default)]
    pub persist_sessions: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            routing: RoutingMode::default(),
            persist_sessions: false,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// 拓扑来源
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    /// 内置的 10 节点环形拓扑
    #[default]
    RingDefault,
    /// 显式邻接矩阵
    Matrix { matrix: Vec<Vec<u64>> },
}

impl TopologySpec {
    pub fn build(&self) -> NetResult<Topology> {
        match self {
            TopologySpec::RingDefault => Ok(default_ring()),
            TopologySpec::Matrix { matrix } => Topology::from_matrix(matrix),
        }
    }
}

/// 配置文件（JSON）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub topology: TopologySpec,
    /// 构造引擎后依次执行的管理操作
    #[serde(default)]
    pub admin: Vec<AdminOp>,
}

impl SimConfig {
    /// 构建引擎并执行 `admin` 中的操作；任一操作失败即返回错误。
    pub fn build_engine(&self) -> NetResult<NetworkEngine> {
        let engine = NetworkEngine::with_topology(self.topology.build()?, self.engine.clone());
        for op in &self.admin {
            op.apply(&engine)?;
        }
        Ok(engine)
    }
}

/// 拓扑管理操作（配置文件与命令行共用）
///
/// JSON 形式为外部标签，例如 `{"node_online": {"node": 3, "neighbors": {"2": 4}}}`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminOp {
    AddEdge { a: usize, b: usize, cost: i64 },
    RemoveEdge { a: usize, b: usize },
    NodeOffline { node: usize },
    NodeOnline { node: usize, neighbors: BTreeMap<usize, i64> },
}

impl AdminOp {
    pub fn apply(&self, engine: &NetworkEngine) -> NetResult<()> {
        match self {
            AdminOp::AddEdge { a, b, cost } => engine.add_edge(*a, *b, *cost),
            AdminOp::RemoveEdge { a, b } => engine.remove_edge(*a, *b),
            AdminOp::NodeOffline { node } => engine.set_node_offline(*node),
            AdminOp::NodeOnline { node, neighbors } => engine.set_node_online(*node, neighbors),
        }
    }

    /// 解析 `a,b,cost`
    pub fn parse_add_edge(raw: &str) -> Result<Self, String> {
        match parse_ints(raw, ',')?.as_slice() {
            &[a, b, cost] => Ok(AdminOp::AddEdge {
                a: to_index(a)?,
                b: to_index(b)?,
                cost,
            }),
            _ => Err(format!("expected a,b,cost, got '{raw}'")),
        }
    }

    /// 解析 `a,b`
    pub fn parse_remove_edge(raw: &str) -> Result<Self, String> {
        match parse_ints(raw, ',')?.as_slice() {
            &[a, b] => Ok(AdminOp::RemoveEdge {
                a: to_index(a)?,
                b: to_index(b)?,
            }),
            _ => Err(format!("expected a,b, got '{raw}'")),
        }
    }

    /// 解析 `node`
    pub fn parse_offline(raw: &str) -> Result<Self, String> {
        let node = raw
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid node '{raw}': {e}"))?;
        Ok(AdminOp::NodeOffline {
            node: to_index(node)?,
        })
    }

    /// 解析 `node:nbr=cost,nbr=cost`（邻居列表可以为空）
    pub fn parse_online(raw: &str) -> Result<Self, String> {
        let (node, rest) = raw
            .split_once(':')
            .ok_or_else(|| format!("expected node:nbr=cost,..., got '{raw}'"))?;
        let node = node
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid node '{node}': {e}"))?;
        let mut neighbors = BTreeMap::new();
        for pair in rest.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match parse_ints(pair, '=')?.as_slice() {
                &[nbr, cost] => {
                    neighbors.insert(to_index(nbr)?, cost);
                }
                _ => return Err(format!("expected nbr=cost, got '{pair}'")),
            }
        }
        Ok(AdminOp::NodeOnline {
            node: to_index(node)?,
            neighbors,
        })
    }
}

fn parse_ints(raw: &str, sep: char) -> Result<Vec<i64>, String> {
    raw.split(sep)
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid integer '{}' in '{raw}': {e}", part.trim()))
        })
        .collect()
}

fn to_index(v: i64) -> Result<usize, String> {
    usize::try_from(v).map_err(|_| format!("node index must be non-negative, got {v}"))
}
