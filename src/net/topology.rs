//! 网络拓扑管理
//!
//! 拓扑是一个 N×N 的对称非负整数代价矩阵：`cost[i][j] == cost[j][i]`，
//! `cost[i][i] == 0`，0 表示两节点之间没有链路（因此零代价链路无法表达）。
//! 节点数在构造时确定，之后只有链路可以变化。
//!
//! 单条链路代价不超过 [`MAX_LINK_COST`]，简单路径最多 N-1 跳，
//! 因此任意路由的总代价都能用 `u64` 精确表示。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::{NetError, NetResult};
use super::id::NodeId;

/// 单条链路代价上限
pub const MAX_LINK_COST: u64 = u32::MAX as u64;

/// 网络拓扑（邻接矩阵）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    size: usize,
    /// 行优先存储的 size × size 代价矩阵
    cost: Vec<u64>,
}

/// 一条无向链路（快照中 `from < to`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub from: usize,
    pub to: usize,
    pub cost: u64,
}

/// 拓扑快照，供可视化/诊断使用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub node_count: usize,
    pub edges: Vec<EdgeInfo>,
}

impl Topology {
    /// 创建没有任何链路的 `size` 节点拓扑
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cost: vec![0; size.saturating_mul(size)],
        }
    }

    /// 从邻接矩阵构建拓扑，校验方阵、对称、对角线为 0 以及代价上限。
    pub fn from_matrix(rows: &[Vec<u64>]) -> NetResult<Self> {
        let size = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(NetError::MalformedTopology(format!(
                "row {i} has {} entries, expected {size}",
                row.len()
            )));
        }
        let mut topo = Self::new(size);
        for (i, row) in rows.iter().enumerate() {
            for (j, &c) in row.iter().enumerate() {
                if i == j && c != 0 {
                    return Err(NetError::MalformedTopology(format!(
                        "self-loop on node {i} (cost {c})"
                    )));
                }
                if c > MAX_LINK_COST {
                    return Err(NetError::MalformedTopology(format!(
                        "cost {c} between {i} and {j} exceeds maximum {MAX_LINK_COST}"
                    )));
                }
                if rows[j][i] != c {
                    return Err(NetError::MalformedTopology(format!(
                        "asymmetric cost between {i} and {j}"
                    )));
                }
                topo.cost[i * size + j] = c;
            }
        }
        Ok(topo)
    }

    /// 节点数 N
    pub fn size(&self) -> usize {
        self.size
    }

    /// 链路代价；0 表示无链路（越界也视为无链路）
    pub fn cost(&self, a: NodeId, b: NodeId) -> u64 {
        if a.0 < self.size && b.0 < self.size {
            self.cost[a.0 * self.size + b.0]
        } else {
            0
        }
    }

    /// 按下标升序返回 `n` 的所有邻居及链路代价
    pub fn neighbors(&self, n: NodeId) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        let row: &[u64] = if n.0 < self.size {
            &self.cost[n.0 * self.size..(n.0 + 1) * self.size]
        } else {
            &[]
        };
        row.iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(j, &c)| (NodeId(j), c))
    }

    /// 路径总代价；若某一跳不存在链路（或总和溢出）则返回 None
    pub fn route_cost(&self, route: &[NodeId]) -> Option<u64> {
        route.windows(2).try_fold(0u64, |acc, hop| {
            let c = self.cost(hop[0], hop[1]);
            acc.checked_add(c).filter(|_| c > 0)
        })
    }

    pub fn check_node(&self, n: usize) -> NetResult<NodeId> {
        if n < self.size {
            Ok(NodeId(n))
        } else {
            Err(NetError::NodeOutOfRange {
                node: n,
                size: self.size,
            })
        }
    }

    pub(crate) fn set_symmetric(&mut self, a: NodeId, b: NodeId, cost: u64) {
        self.cost[a.0 * self.size + b.0] = cost;
        self.cost[b.0 * self.size + a.0] = cost;
    }

    /// 添加（或更新）一条双向链路
    pub fn add_edge(&mut self, a: usize, b: usize, cost: i64) -> NetResult<()> {
        let a = self.check_node(a)?;
        let b = self.check_node(b)?;
        let cost = positive_cost(cost)?;
        if a == b {
            // 对角线恒为 0
            return Err(NetError::MalformedTopology(format!(
                "cannot add self-loop on node {a}"
            )));
        }
        self.set_symmetric(a, b, cost);
        debug!(a = %a, b = %b, cost, "添加链路");
        Ok(())
    }

    /// 删除双向链路；链路不存在时不做任何事
    pub fn remove_edge(&mut self, a: usize, b: usize) -> NetResult<()> {
        let a = self.check_node(a)?;
        let b = self.check_node(b)?;
        self.set_symmetric(a, b, 0);
        debug!(a = %a, b = %b, "删除链路");
        Ok(())
    }

    /// 断开节点的所有链路
    pub fn set_node_offline(&mut self, n: usize) -> NetResult<()> {
        let n = self.check_node(n)?;
        for i in 0..self.size {
            self.set_symmetric(n, NodeId(i), 0);
        }
        debug!(node = %n, "节点下线");
        Ok(())
    }

    /// 节点上线并连接到给定邻居。
    ///
    /// 先校验全部参数，任一不合法则整个调用不生效。
    pub fn set_node_online(&mut self, n: usize, neighbors: &BTreeMap<usize, i64>) -> NetResult<()> {
        let n = self.check_node(n)?;
        let mut pending = Vec::with_capacity(neighbors.len());
        for (&nbr, &cost) in neighbors {
            let nbr = self.check_node(nbr)?;
            let cost = positive_cost(cost)?;
            if nbr == n {
                return Err(NetError::MalformedTopology(format!(
                    "node {n} cannot be its own neighbor"
                )));
            }
            pending.push((nbr, cost));
        }
        for (nbr, cost) in pending {
            trace!(node = %n, nbr = %nbr, cost, "恢复链路");
            self.set_symmetric(n, nbr, cost);
        }
        debug!(node = %n, links = neighbors.len(), "节点上线");
        Ok(())
    }

    /// 每条无向链路只出现一次（`from < to`），按 (from, to) 升序
    pub fn snapshot(&self) -> TopologySnapshot {
        let mut edges = Vec::new();
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let cost = self.cost[i * self.size + j];
                if cost > 0 {
                    edges.push(EdgeInfo { from: i, to: j, cost });
                }
            }
        }
        TopologySnapshot {
            node_count: self.size,
            edges,
        }
    }
}

fn positive_cost(cost: i64) -> NetResult<u64> {
    let c = u64::try_from(cost)
        .ok()
        .filter(|&c| c > 0)
        .ok_or(NetError::NonPositiveCost { cost })?;
    if c > MAX_LINK_COST {
        return Err(NetError::CostTooLarge {
            cost,
            max: MAX_LINK_COST,
        });
    }
    Ok(c)
}
