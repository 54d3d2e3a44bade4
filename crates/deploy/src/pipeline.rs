//! The deployment pipeline.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Idle -> AccountImported -> Built -> Declared -> ClassHashExtracted
//!      -> Deployed -> AddressExtracted -> Persisted
//! ```
//!
//! Each command carries a `required` flag. A failed command that is not
//! required (the account import) is recorded as [`StageOutcome::Tolerated`]
//! and the run goes on. Any other failure stops the run at that stage and
//! nothing is written to the [`DeploymentStore`], so a previously saved
//! record survives.

use std::path::PathBuf;

use crate::{
    config::StarkupConfig,
    extract::{MarkerExtractor, OutputExtractor},
    process::{CommandRunner, CommandSpec, StageOutput},
    record::{AccountDescriptor, DeploymentRecord},
    services::{DevnetNode, NodeStatus},
    store::DeploymentStore,
};

/// A step of the pipeline, named after the state reached when it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum PipelineStage {
    AccountImported,
    Built,
    /// Only reached by [`DeploymentPipeline::check`].
    Tested,
    Declared,
    ClassHashExtracted,
    Deployed,
    AddressExtracted,
    Persisted,
}

/// How a stage that did not abort the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The stage failed but is not required; carries the tool's error text.
    Tolerated(String),
}

/// Why a pipeline run stopped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("account import failed: {stderr}")]
    ImportFailed { stderr: String },
    #[error("build failed: {stderr}")]
    BuildFailed { stderr: String },
    #[error("tests failed: {stderr}")]
    TestsFailed { stderr: String },
    #[error("contract artifact not found at {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("declare failed: {stderr}")]
    DeclareFailed { stderr: String },
    #[error("declare output has no `class_hash:` line")]
    ClassHashMissing,
    #[error("deploy failed: {stderr}")]
    DeployFailed { stderr: String },
    #[error("deploy output has no `contract_address:` line")]
    AddressMissing,
    #[error("failed to save deployment record: {0}")]
    Persist(String),
}

/// Terminal failure of a run: the stage that failed and why.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[source]
    pub error: PipelineError,
}

impl PipelineFailure {
    fn new(stage: PipelineStage, error: PipelineError) -> Self {
        tracing::error!(%stage, %error, "Pipeline aborted");
        Self { stage, error }
    }
}

/// Why [`DeploymentPipeline::deploy_to`] did not deploy.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The node never answered within the poll window; no stage ran.
    #[error("devnet is unreachable at {0}")]
    NodeUnreachable(String),
    #[error("failed to start devnet: {0}")]
    Launch(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineFailure),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    /// The record that was persisted.
    pub record: DeploymentRecord,
    /// Outcome of every stage, in execution order.
    pub outcomes: Vec<(PipelineStage, StageOutcome)>,
}

impl PipelineRun {
    /// Stages that failed without stopping the run.
    pub fn tolerated(&self) -> impl Iterator<Item = (PipelineStage, &str)> {
        self.outcomes.iter().filter_map(|(stage, outcome)| match outcome {
            StageOutcome::Tolerated(reason) => Some((*stage, reason.as_str())),
            StageOutcome::Completed => None,
        })
    }
}

/// Runs build, declare and deploy against a node, then persists the record.
pub struct DeploymentPipeline<'a, R, E = MarkerExtractor> {
    runner: &'a R,
    extractor: E,
    config: &'a StarkupConfig,
    store: DeploymentStore,
}

impl<'a, R: CommandRunner> DeploymentPipeline<'a, R> {
    pub fn new(runner: &'a R, config: &'a StarkupConfig) -> Self {
        Self {
            runner,
            extractor: MarkerExtractor,
            config,
            store: config.store(),
        }
    }
}

impl<'a, R: CommandRunner, E: OutputExtractor> DeploymentPipeline<'a, R, E> {
    /// Use another way of reading identifiers out of the CLI output.
    pub fn with_extractor<X: OutputExtractor>(self, extractor: X) -> DeploymentPipeline<'a, R, X> {
        DeploymentPipeline {
            runner: self.runner,
            extractor,
            config: self.config,
            store: self.store,
        }
    }

    pub fn store(&self) -> &DeploymentStore {
        &self.store
    }

    /// Make sure `node` is answering, snapshot its accounts, then run every stage.
    ///
    /// When the node never becomes ready no command is run at all.
    pub async fn deploy_to(&self, node: &DevnetNode) -> Result<PipelineRun, DeployError> {
        let status = node
            .ensure_running()
            .await
            .map_err(|e| DeployError::Launch(format!("{e:#}")))?;

        if status == NodeStatus::TimedOut {
            tracing::error!(url = %node.url(), "Devnet is unreachable, nothing was deployed");
            return Err(DeployError::NodeUnreachable(node.url()));
        }

        let accounts = node.predeployed_accounts().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch predeployed accounts, recording none");
            Vec::new()
        });

        Ok(self.run(accounts).await?)
    }

    /// Run every stage against the configured node.
    ///
    /// `accounts` is the node's account listing, snapshotted into the record.
    /// The node is expected to be answering already.
    pub async fn run(
        &self,
        accounts: Vec<AccountDescriptor>,
    ) -> Result<PipelineRun, PipelineFailure> {
        let node_url = self.config.devnet.url();
        let sncast = &self.config.sncast;
        let scarb = &self.config.scarb;
        let mut outcomes = Vec::new();

        tracing::info!(url = %node_url, contract = %scarb.contract_name, "Starting deployment pipeline...");

        // Account import
        self.stage(
            sncast.import_command(&node_url).cwd(&scarb.project_dir),
            PipelineStage::AccountImported,
            |stderr| PipelineError::ImportFailed { stderr },
            &mut outcomes,
        )
        .await?;

        // Build
        self.build(&mut outcomes).await?;

        // Declare
        let artifact = scarb.artifact_path();
        if !artifact.is_file() {
            return Err(PipelineFailure::new(
                PipelineStage::Declared,
                PipelineError::ArtifactMissing(artifact),
            ));
        }

        tracing::info!(contract = %scarb.contract_name, "Declaring contract...");
        let declare = self
            .stage(
                sncast
                    .declare_command(&node_url, &scarb.contract_name)
                    .cwd(&scarb.project_dir),
                PipelineStage::Declared,
                |stderr| PipelineError::DeclareFailed { stderr },
                &mut outcomes,
            )
            .await?;

        let class_hash = self.extractor.class_hash(&declare.stdout).ok_or_else(|| {
            PipelineFailure::new(
                PipelineStage::ClassHashExtracted,
                PipelineError::ClassHashMissing,
            )
        })?;
        tracing::info!(%class_hash, "Class hash extracted");
        outcomes.push((PipelineStage::ClassHashExtracted, StageOutcome::Completed));

        // Deploy
        tracing::info!(%class_hash, salt = %sncast.salt, "Deploying contract...");
        let deploy = self
            .stage(
                sncast
                    .deploy_command(&node_url, &class_hash)
                    .cwd(&scarb.project_dir),
                PipelineStage::Deployed,
                |stderr| PipelineError::DeployFailed { stderr },
                &mut outcomes,
            )
            .await?;

        let address = self.extractor.contract_address(&deploy.stdout).ok_or_else(|| {
            PipelineFailure::new(
                PipelineStage::AddressExtracted,
                PipelineError::AddressMissing,
            )
        })?;
        tracing::info!(contract_address = %address, "Contract address extracted");
        outcomes.push((PipelineStage::AddressExtracted, StageOutcome::Completed));

        // Persist
        let record = DeploymentRecord::new(address, node_url, accounts);
        self.store.save(&record).map_err(|e| {
            PipelineFailure::new(PipelineStage::Persisted, PipelineError::Persist(format!("{e:#}")))
        })?;
        outcomes.push((PipelineStage::Persisted, StageOutcome::Completed));

        tracing::info!("✓ Deployment complete!");

        Ok(PipelineRun { record, outcomes })
    }

    /// Build the package and run its tests, without touching the node.
    pub async fn check(&self) -> Result<Vec<(PipelineStage, StageOutcome)>, PipelineFailure> {
        let mut outcomes = Vec::new();
        self.build(&mut outcomes).await?;

        tracing::info!("Running contract tests...");
        self.stage(
            self.config.scarb.test_command(),
            PipelineStage::Tested,
            |stderr| PipelineError::TestsFailed { stderr },
            &mut outcomes,
        )
        .await?;

        Ok(outcomes)
    }

    async fn build(
        &self,
        outcomes: &mut Vec<(PipelineStage, StageOutcome)>,
    ) -> Result<(), PipelineFailure> {
        tracing::info!(project = %self.config.scarb.project_dir.display(), "Building contract...");
        self.stage(
            self.config.scarb.build_command(),
            PipelineStage::Built,
            |stderr| PipelineError::BuildFailed { stderr },
            outcomes,
        )
        .await?;
        Ok(())
    }

    /// Run the command of `stage` and record its outcome.
    ///
    /// A failure stops the pipeline at `stage` when the command is required,
    /// and is recorded as tolerated otherwise.
    async fn stage(
        &self,
        command: CommandSpec,
        stage: PipelineStage,
        on_failure: impl FnOnce(String) -> PipelineError,
        outcomes: &mut Vec<(PipelineStage, StageOutcome)>,
    ) -> Result<StageOutput, PipelineFailure> {
        let output = self.runner.run(&command).await;

        let outcome = if output.success {
            tracing::info!(%stage, "Stage completed");
            StageOutcome::Completed
        } else if command.required {
            return Err(PipelineFailure::new(
                stage,
                on_failure(output.error_text().to_string()),
            ));
        } else {
            tracing::warn!(
                %stage,
                error = %output.error_text(),
                "{} failed but is not required, continuing",
                command.description
            );
            StageOutcome::Tolerated(output.error_text().to_string())
        };

        outcomes.push((stage, outcome));
        Ok(output)
    }
}
