//! Integration tests for starkup-deploy.
//!
//! The build and deployment tools are replaced by small shell scripts, so the
//! pipeline runs real processes without a devnet or a Cairo toolchain.
//! Run with: cargo test --test pipeline_test

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use starkup_deploy::{
    CommandRunner, CommandSpec, DeploymentPipeline, PipelineError, PipelineStage, Session,
    StageOutput, StarkupConfig, SystemRunner,
};
use tempdir::TempDir;

const FAKE_SCARB: &str = "#!/bin/sh\nexit 0\n";

const FAKE_SNCAST: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/sncast.log"
case "$*" in
  *"account import"*) echo "Account already exists" >&2; exit 1 ;;
  *" declare "*) echo "command: declare"; echo "class_hash: 0x0abc"; echo "transaction_hash: 0x1" ;;
  *" deploy "*) echo "command: deploy"; echo "contract_address: 0x0def"; echo "transaction_hash: 0x2" ;;
esac
"#;

const FAILING_DEPLOY_SNCAST: &str = r#"#!/bin/sh
case "$*" in
  *" declare "*) echo "class_hash: 0x0abc" ;;
  *" deploy "*) echo "Error: insufficient balance" >&2; exit 2 ;;
esac
"#;

/// Initialize tracing for tests (idempotent).
fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A project with a compiled artifact and fake tools, and the matching config.
#[cfg(unix)]
fn project(dir: &TempDir) -> StarkupConfig {
    let mut config = StarkupConfig::default();
    config.scarb.project_dir = dir.path().to_path_buf();
    config.record_path = dir.path().join("deployment-info.json");

    let artifact = config.scarb.artifact_path();
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(&artifact, "{}").unwrap();

    config.scarb.binary = write_script(dir.path(), "scarb", FAKE_SCARB)
        .display()
        .to_string();
    config.sncast.binary = write_script(dir.path(), "sncast", FAKE_SNCAST)
        .display()
        .to_string();

    config
}

#[cfg(unix)]
#[tokio::test]
async fn test_pipeline_with_real_processes() {
    init_test_tracing();
    let dir = TempDir::new("starkup-it").unwrap();
    let mut config = project(&dir);
    let runner = SystemRunner;

    let run = DeploymentPipeline::new(&runner, &config)
        .run(vec![])
        .await
        .unwrap();

    assert_eq!(run.record.contract_address.as_deref().map(String::as_str), Some("0x0def"));
    assert_eq!(
        run.tolerated().map(|(stage, _)| stage).collect::<Vec<_>>(),
        vec![PipelineStage::AccountImported]
    );

    let log = std::fs::read_to_string(dir.path().join("sncast.log")).unwrap();
    let deploy_line = log.lines().find(|l| l.contains(" deploy ")).unwrap();
    assert!(deploy_line.contains("--class-hash 0x0abc"));
    assert!(deploy_line.contains("--constructor-calldata 0x48656c6c6f20576f726c64"));

    // A failing redeploy leaves the first record in place.
    config.sncast.binary = write_script(dir.path(), "sncast-failing", FAILING_DEPLOY_SNCAST)
        .display()
        .to_string();
    let pipeline = DeploymentPipeline::new(&runner, &config);
    let failure = pipeline.run(vec![]).await.unwrap_err();

    assert_eq!(failure.stage, PipelineStage::Deployed);
    assert!(
        matches!(&failure.error, PipelineError::DeployFailed { stderr } if stderr == "Error: insufficient balance")
    );
    assert_eq!(pipeline.store().load().unwrap(), Some(run.record));
}

/// Runner that only counts calls.
#[derive(Default)]
struct CountingRunner {
    calls: AtomicUsize,
}

impl CommandRunner for CountingRunner {
    async fn run(&self, _command: &CommandSpec) -> StageOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StageOutput::ok("response: [0x0]")
    }
}

#[tokio::test]
async fn test_session_from_stored_record() {
    init_test_tracing();
    let dir = TempDir::new("starkup-it").unwrap();
    let mut config = StarkupConfig::default();
    config.record_path = dir.path().join("deployment-info.json");

    std::fs::write(
        &config.record_path,
        r#"{"contract_address": "0x0555", "devnet_url": "http://127.0.0.1:5050", "accounts": [], "deployment_time": "2024-05-01 10:11:12"}"#,
    )
    .unwrap();
    let record = config.store().load().unwrap().unwrap();

    let runner = CountingRunner::default();
    let session = Session::from_record(&runner, &config, record).unwrap();

    let mut out = Vec::new();
    session
        .run("5\nten\n\n6\n0\n".as_bytes(), &mut out)
        .await
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    assert!(out.contains("Please enter a valid number"));
    assert!(out.contains("2024-05-01 10:11:12"));
}
