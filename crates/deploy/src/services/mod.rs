//! External collaborators of the deployment.
//!
//! Each service is in its own submodule with:
//! - `cmd.rs` - Command builder for generating argv vectors
//! - `mod.rs` - Config and the operations built on it

pub mod devnet;
pub mod scarb;
pub mod sncast;

// Re-export commonly used types
pub use devnet::{DevnetConfig, DevnetNode, NodeStatus, ProcessRegistry};
pub use scarb::ScarbConfig;
pub use sncast::{ContractClient, SncastConfig};
