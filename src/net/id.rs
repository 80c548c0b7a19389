//! 标识符类型
//!
//! 定义网络节点的唯一标识符。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 节点标识符：拓扑矩阵中的行/列下标，取值范围 `[0, N)`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 把节点序列格式化为 `[0, 1, 2]` 形式（用于 trace 输出）。
pub fn fmt_nodes(nodes: &[NodeId]) -> String {
    let parts: Vec<String> = nodes.iter().map(|n| n.0.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
