pub mod config;
pub mod crypto;
pub mod net;
pub mod topo;
