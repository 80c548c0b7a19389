//! 错误类型
//!
//! 拓扑管理与消息发送过程中可能返回给调用方的错误。

use thiserror::Error;

use crate::crypto::CipherError;

/// 网络引擎错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    /// 节点下标越界（管理操作的参数错误）
    #[error("invalid argument: node {node} out of range (network has {size} nodes)")]
    NodeOutOfRange { node: usize, size: usize },

    /// 链路代价必须为正
    #[error("invalid argument: edge cost must be positive, got {cost}")]
    NonPositiveCost { cost: i64 },

    /// 链路代价超过上限
    #[error("invalid argument: edge cost {cost} exceeds maximum {max}")]
    CostTooLarge { cost: i64, max: u64 },

    /// 邻接矩阵不合法（非方阵、不对称或对角线非零）
    #[error("invalid argument: malformed topology: {0}")]
    MalformedTopology(String),

    /// 发送消息时源/目的节点不存在
    #[error("invalid node {node} (network has {size} nodes)")]
    InvalidNode { node: usize, size: usize },

    /// 加密组件错误
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl NetError {
    /// 是否属于 InvalidArgument 一类（调用方输入错误，操作未生效）。
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            NetError::NodeOutOfRange { .. }
                | NetError::NonPositiveCost { .. }
                | NetError::CostTooLarge { .. }
                | NetError::MalformedTopology(_)
        )
    }

    /// 错误种类名，用于 trace 中的 `Error: {kind}: {message}` 行。
    pub fn kind(&self) -> &'static str {
        match self {
            NetError::NodeOutOfRange { .. } => "NodeOutOfRange",
            NetError::NonPositiveCost { .. } => "NonPositiveCost",
            NetError::CostTooLarge { .. } => "CostTooLarge",
            NetError::MalformedTopology(_) => "MalformedTopology",
            NetError::InvalidNode { .. } => "InvalidNode",
            NetError::Cipher(e) => e.kind(),
        }
    }
}

/// 网络操作的 Result 类型
pub type NetResult<T> = Result<T, NetError>;
