pub mod config;
pub mod engine;
pub mod node;

pub use config::{ExplorerConfig, RpcConfig};
pub use engine::{Explorer, ExplorerError};
pub use node::{MockNode, NodeError, NodeGateway, RpcClient};
