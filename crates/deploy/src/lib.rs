//! starkup-deploy - Deployment library for a local Starknet devnet.
//!
//! This crate starts (or reuses) a local devnet node, builds, declares and
//! deploys a contract against it, records the deployment, and drives an
//! interactive session with the deployed contract.

pub mod codec;
mod config;
pub mod extract;
pub mod pipeline;
pub mod process;
mod record;
pub mod services;
pub mod session;
mod store;

pub use codec::{DecodeError, decode_amount, decode_word, encode_text};
pub use config::{CONFIG_FILENAME, ENV_PREFIX, StarkupConfig};
pub use extract::{ClassHash, ContractAddress, MarkerExtractor, OutputExtractor};
pub use pipeline::{
    DeployError, DeploymentPipeline, PipelineError, PipelineFailure, PipelineRun, PipelineStage,
    StageOutcome,
};
pub use process::{CommandRunner, CommandSpec, StageOutput, SystemRunner};
pub use record::{AccountDescriptor, DEPLOYMENT_TIME_FORMAT, DeploymentRecord};
pub use services::{
    ContractClient, DevnetConfig, DevnetNode, NodeStatus, ScarbConfig, SncastConfig,
};
pub use session::{MenuChoice, Session, SessionEnd, SessionError};
pub use store::{DEFAULT_RECORD_PATH, DeploymentStore};
