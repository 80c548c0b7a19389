//! 拓扑构建
//!
//! 目前只有默认的 10 节点环形拓扑。

pub mod ring;

pub use ring::{DEFAULT_RING_COSTS, DEFAULT_RING_SIZE, build_ring, default_ring};
