pub mod api;
pub mod error;
pub mod mock;
pub mod rpc_client;
pub mod types;

pub use api::{NodeGateway, NodeQueries};
pub use error::NodeError;
pub use mock::MockNode;
pub use rpc_client::RpcClient;

#[cfg(test)]
mod tests;
