//! 路由计算
//!
//! 所有函数都是只读的纯函数，作用于某一时刻的拓扑快照：
//! - [`shortest_path`]：Dijkstra 最短路径（0 代价视为无链路）
//! - [`top_k_routes`]：基于链路排除的贪心 top-K，不是真正的 K 最短路径
//! - [`flood_route`]：类 AODV 的洪泛发现（BFS，按跳数而非代价）
//! - [`all_simple_paths`]：枚举所有简单路径（显式栈，仅用于诊断）

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::id::NodeId;
use super::topology::Topology;

/// 一条路由及其总代价
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub cost: u64,
}

impl Route {
    /// 路由经过的无向链路
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.windows(2).map(|hop| (hop[0], hop[1]))
    }
}

/// 被排除的无向链路集合（`(a, b)` 与 `(b, a)` 视为同一条）
#[derive(Debug, Default, Clone)]
pub struct EdgeExclusion {
    edges: HashSet<(NodeId, NodeId)>,
}

impl EdgeExclusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: NodeId, b: NodeId) {
        self.edges.insert(undirected(a, b));
    }

    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.edges.contains(&undirected(a, b))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn undirected(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Dijkstra 最短路径；不可达时返回空路径。
pub fn shortest_path(topo: &Topology, src: NodeId, dst: NodeId) -> Vec<NodeId> {
    shortest_path_excluding(topo, src, dst, &EdgeExclusion::default())
        .map(|r| r.nodes)
        .unwrap_or_default()
}

/// 忽略 `excluded` 中链路的 Dijkstra。
///
/// 前沿按 (代价, 节点下标) 出堆，邻居按下标升序松弛且仅在严格更优时更新，
/// 目的节点出堆即提前结束。
pub fn shortest_path_excluding(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    excluded: &EdgeExclusion,
) -> Option<Route> {
    let n = topo.size();
    if src.0 >= n || dst.0 >= n {
        return None;
    }

    let mut dist: Vec<Option<u64>> = vec![None; n];
    let mut prev: Vec<Option<NodeId>> = vec![None; n];
    let mut heap = BinaryHeap::new();
    dist[src.0] = Some(0);
    heap.push(Reverse((0u64, src)));

    while let Some(Reverse((cost_u, u))) = heap.pop() {
        if dist[u.0].is_some_and(|d| cost_u > d) {
            continue;
        }
        if u == dst {
            break;
        }
        for (v, w) in topo.neighbors(u) {
            if excluded.contains(u, v) {
                continue;
            }
            // 链路代价有上限，简单路径的累加不会溢出
            let next = cost_u + w;
            if dist[v.0].is_none_or(|d| next < d) {
                trace!(u = %u, v = %v, next, "松弛");
                dist[v.0] = Some(next);
                prev[v.0] = Some(u);
                heap.push(Reverse((next, v)));
            }
        }
    }

    let cost = dist[dst.0]?;
    let mut nodes = vec![dst];
    let mut cur = dst;
    while let Some(p) = prev[cur.0] {
        nodes.push(p);
        cur = p;
    }
    nodes.reverse();
    Some(Route { nodes, cost })
}

/// 贪心 top-K：每轮在排除已用链路后再跑一次 Dijkstra。
///
/// 排除集合跨轮累积；某一轮找不到路由即停止。
pub fn top_k_routes(topo: &Topology, src: NodeId, dst: NodeId, k: usize) -> Vec<Route> {
    let mut routes = Vec::with_capacity(k);
    let mut excluded = EdgeExclusion::new();
    for round in 0..k {
        let Some(route) = shortest_path_excluding(topo, src, dst, &excluded) else {
            debug!(round, "排除链路后无可用路由，提前结束");
            break;
        };
        for (a, b) in route.edges() {
            excluded.insert(a, b);
        }
        let hops = route.nodes.len().saturating_sub(1);
        debug!(round, cost = route.cost, hops, excluded = excluded.len(), "找到路由");
        routes.push(route);
        if hops == 0 {
            // src == dst：没有可排除的链路，后续轮次只会重复同一条路由
            break;
        }
    }
    routes
}

/// 类 AODV 的洪泛路由发现：BFS 记录首个到达每个节点的父节点，
/// 第一次发现 `dst` 即停止洪泛。
pub fn flood_route(topo: &Topology, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
    let n = topo.size();
    if src.0 >= n || dst.0 >= n {
        return None;
    }
    if src == dst {
        return Some(vec![src]);
    }

    let mut parent: Vec<Option<NodeId>> = vec![None; n];
    let mut seen = vec![false; n];
    let mut q: VecDeque<NodeId> = VecDeque::new();
    seen[src.0] = true;
    q.push_back(src);

    let mut found = false;
    'flood: while let Some(u) = q.pop_front() {
        for (v, _) in topo.neighbors(u) {
            if seen[v.0] {
                continue;
            }
            seen[v.0] = true;
            parent[v.0] = Some(u);
            if v == dst {
                found = true;
                break 'flood;
            }
            q.push_back(v);
        }
    }
    if !found {
        debug!(src = %src, dst = %dst, "洪泛结束，未发现目的节点");
        return None;
    }

    let mut path = vec![dst];
    let mut cur = dst;
    while let Some(p) = parent[cur.0] {
        path.push(p);
        cur = p;
    }
    path.reverse();
    Some(path)
}

/// 枚举 `start` 到 `end` 的所有简单路径（DFS 顺序，邻居按下标升序）。
///
/// 用显式栈代替递归，栈深不超过 N。
pub fn all_simple_paths(topo: &Topology, start: NodeId, end: NodeId) -> Vec<Vec<NodeId>> {
    let n = topo.size();
    if start.0 >= n || end.0 >= n {
        return Vec::new();
    }
    if start == end {
        return vec![vec![start]];
    }

    let mut paths = Vec::new();
    let mut path = vec![start];
    let mut on_path = vec![false; n];
    on_path[start.0] = true;
    // cursors[i] 为 path[i] 下一个待尝试的邻居下标
    let mut cursors = vec![0usize];

    while let Some(depth) = cursors.len().checked_sub(1) {
        let u = path[depth];
        let mut next = None;
        while cursors[depth] < n {
            let v = NodeId(cursors[depth]);
            cursors[depth] += 1;
            if topo.cost(u, v) > 0 && !on_path[v.0] {
                next = Some(v);
                break;
            }
        }
        match next {
            Some(v) if v == end => {
                let mut found = path.clone();
                found.push(v);
                paths.push(found);
            }
            Some(v) => {
                on_path[v.0] = true;
                path.push(v);
                cursors.push(0);
            }
            None => {
                cursors.pop();
                if let Some(done) = path.pop() {
                    on_path[done.0] = false;
                }
            }
        }
    }
    paths
}
