//! Derivation engine.
//!
//! Turns primitive node queries into the facts the dashboard shows: fees,
//! address balances and history, paged activity, fee advice and the
//! difficulty outlook.
//!
//! # Architecture guarantees
//! * **No state**: nothing survives a call. Each call reads its own tip and
//!   keeps its own seen-set and scan bounds.
//! * **No index**: history is re-derived by walking back from the tip, bounded
//!   by the scan depths in [`ExplorerConfig`](crate::config::ExplorerConfig).
//! * **One gateway**: every node access goes through
//!   [`NodeGateway`](crate::node::NodeGateway), so the whole engine runs
//!   against [`MockNode`](crate::node::MockNode) in tests.
//! * **Sequential**: one round-trip at a time, inputs resolved in source order.

pub mod address;
pub mod enricher;
pub mod error;
pub mod explorer;
pub mod fees;
pub mod mempool;
pub mod paginator;
pub mod retarget;
pub mod scanner;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ExplorerError;
pub use explorer::Explorer;
pub use types::*;
