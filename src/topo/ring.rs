//! 默认环形拓扑构建
//!
//! 10 个节点首尾相连：0-1-2-…-9-0。

use crate::net::{NodeId, Topology};

/// 默认拓扑节点数
pub const DEFAULT_RING_SIZE: usize = 10;

/// 环上第 i 条链路 (i, i+1 mod N) 的代价
pub const DEFAULT_RING_COSTS: [u32; DEFAULT_RING_SIZE] = [2, 3, 4, 6, 1, 7, 2, 8, 9, 5];

/// 构建环形拓扑，`costs[i]` 为链路 (i, (i+1) % N) 的代价，0 表示不建链路。
///
/// 代价类型为 `u32`，天然不超过 [`MAX_LINK_COST`](crate::net::MAX_LINK_COST)。
pub fn build_ring(costs: &[u32]) -> Topology {
    let n = costs.len();
    let mut topo = Topology::new(n);
    for (i, &c) in costs.iter().enumerate() {
        let j = (i + 1) % n;
        if i != j {
            topo.set_symmetric(NodeId(i), NodeId(j), u64::from(c));
        }
    }
    topo
}

/// 默认 10 节点环形拓扑
pub fn default_ring() -> Topology {
    build_ring(&DEFAULT_RING_COSTS)
}
