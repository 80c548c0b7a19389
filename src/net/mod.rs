//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：节点标识、拓扑、路由计算和网络引擎。

// 子模块声明
mod id;
mod error;
mod topology;
mod engine;
pub mod routing;

// 重新导出公共接口
pub use id::{NodeId, fmt_nodes};
pub use error::{NetError, NetResult};
pub use topology::{EdgeInfo, MAX_LINK_COST, Topology, TopologySnapshot};
pub use routing::{EdgeExclusion, Route};
pub use engine::{DeliveryStatus, NetworkEngine, SendOutcome};
#[cfg(test)]
pub(crate) use engine::{decrypt_at_destination, settle};
