//! Interactive session against a deployed contract.
//!
//! Reads menu choices line by line, calls or invokes the contract through a
//! [`CommandRunner`] and writes results to an output stream. Failures of a
//! single operation are reported and the loop continues.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::{
    codec,
    config::StarkupConfig,
    extract::{MarkerExtractor, OutputExtractor},
    process::{CommandRunner, StageOutput},
    record::DeploymentRecord,
    services::{ContractClient, DevnetNode},
};

/// Marker of the result line printed by `sncast call`.
pub const RESPONSE_KEY: &str = "response";

/// Why a session could not start.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("devnet is not running at {0}")]
    NodeUnreachable(String),
    #[error("no deployment record at {}, deploy the contract first", .0.display())]
    StoreAbsent(PathBuf),
    #[error("deployment record has no contract address")]
    AddressAbsent,
    #[error("failed to read deployment record: {0}")]
    Store(String),
}

/// How [`Session::run_until`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionEnd {
    /// `Exit` was chosen or the input ended.
    Finished,
    /// The shutdown signal fired first. A pending read may still be in flight.
    Interrupted,
}

/// One entry of the session menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MenuChoice {
    #[strum(to_string = "Get greeting")]
    ReadGreeting,
    #[strum(to_string = "Set greeting")]
    WriteGreeting,
    #[strum(to_string = "Get balance")]
    ReadBalance,
    #[strum(to_string = "Deposit")]
    Deposit,
    #[strum(to_string = "Withdraw")]
    Withdraw,
    #[strum(to_string = "Show contract info")]
    ShowInfo,
    #[strum(to_string = "Exit")]
    Exit,
}

impl MenuChoice {
    const MENU: [(&'static str, MenuChoice); 7] = [
        ("1", MenuChoice::ReadGreeting),
        ("2", MenuChoice::WriteGreeting),
        ("3", MenuChoice::ReadBalance),
        ("4", MenuChoice::Deposit),
        ("5", MenuChoice::Withdraw),
        ("6", MenuChoice::ShowInfo),
        ("0", MenuChoice::Exit),
    ];

    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::MENU
            .iter()
            .find(|(key, _)| *key == input)
            .map(|(_, choice)| *choice)
    }
}

/// Reduce `sncast call` output to its first result word.
///
/// Uses the `response:` line when present (brackets and separators removed),
/// otherwise the last whitespace-separated token of the output.
pub fn response_word(stdout: &str) -> Option<String> {
    let from_marker = MarkerExtractor
        .extract(stdout, RESPONSE_KEY)
        .and_then(|value| {
            value
                .split(|c: char| c == '[' || c == ']' || c == ',' || c.is_whitespace())
                .find(|token| !token.is_empty())
                .map(str::to_string)
        });

    from_marker.or_else(|| stdout.split_whitespace().last().map(str::to_string))
}

/// Render a deployment record with its account snapshot.
pub fn record_table(record: &DeploymentRecord) -> String {
    let address = record
        .contract_address
        .as_ref()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut summary = Table::new();
    summary.add_row(vec!["Contract address", address.as_str()]);
    summary.add_row(vec!["Devnet URL", record.node_url.as_str()]);
    summary.add_row(vec!["Deployed at", record.deployed_at.as_str()]);

    if record.accounts.is_empty() {
        return summary.to_string();
    }

    let mut accounts = Table::new();
    accounts.set_header(vec!["#", "Address", "Private key"]);
    for (index, account) in record.accounts.iter().enumerate() {
        accounts.add_row(vec![
            index.to_string(),
            account.address.clone(),
            account.private_key.clone(),
        ]);
    }

    format!("{summary}\n{accounts}")
}

/// Result of prompting for an amount.
enum AmountInput {
    Amount(u128),
    Cancelled,
    EndOfInput,
}

/// An interactive session bound to one deployed contract.
pub struct Session<'a, R> {
    client: ContractClient<'a, R>,
    record: DeploymentRecord,
}

impl<'a, R: CommandRunner> Session<'a, R> {
    /// Check the node is alive and load the record before starting.
    pub async fn open(
        runner: &'a R,
        config: &StarkupConfig,
        node: &DevnetNode,
    ) -> Result<Self, SessionError> {
        if !node.is_alive().await {
            return Err(SessionError::NodeUnreachable(node.url()));
        }

        let store = config.store();
        let record = store
            .load()
            .map_err(|e| SessionError::Store(format!("{e:#}")))?
            .ok_or_else(|| SessionError::StoreAbsent(store.path().to_path_buf()))?;

        Self::from_record(runner, config, record)
    }

    /// Start a session from an already loaded record.
    pub fn from_record(
        runner: &'a R,
        config: &StarkupConfig,
        record: DeploymentRecord,
    ) -> Result<Self, SessionError> {
        let address = record
            .contract_address
            .clone()
            .ok_or(SessionError::AddressAbsent)?;

        let client = ContractClient::new(runner, &config.sncast, &record.node_url, address)
            .working_dir(&config.scarb.project_dir);

        Ok(Self { client, record })
    }

    pub fn record(&self) -> &DeploymentRecord {
        &self.record
    }

    /// Like [`Session::run`], but gives up as soon as `shutdown` completes.
    ///
    /// The loop is dropped mid-read on interrupt, so the caller decides what
    /// happens to the reader afterwards.
    pub async fn run_until<I, W, S>(&self, input: I, out: &mut W, shutdown: S) -> Result<SessionEnd>
    where
        I: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run(input, out) => result.map(|()| SessionEnd::Finished),
            () = shutdown => {
                tracing::warn!("Session interrupted");
                Ok(SessionEnd::Interrupted)
            }
        }
    }

    /// Serve menu choices until `Exit` or end of input.
    pub async fn run<I, W>(&self, input: I, out: &mut W) -> Result<()>
    where
        I: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        writeln!(out, "Connected to contract {}", self.client.address())?;
        writeln!(out, "Devnet URL: {}", self.record.node_url)?;

        loop {
            self.print_menu(out)?;
            let Some(line) = prompt(&mut lines, out, "Choose an option (0-6): ").await? else {
                break;
            };

            let Some(choice) = MenuChoice::parse(&line) else {
                writeln!(out, "Invalid choice, please try again")?;
                continue;
            };
            tracing::debug!(%choice, "Menu choice");

            match choice {
                MenuChoice::Exit => break,
                MenuChoice::ReadGreeting => self.read_greeting(out).await?,
                MenuChoice::WriteGreeting => {
                    let Some(greeting) = prompt(&mut lines, out, "New greeting: ").await? else {
                        break;
                    };
                    if !greeting.is_empty() {
                        self.write_greeting(&greeting, out).await?;
                    }
                }
                MenuChoice::ReadBalance => self.read_balance(out).await?,
                MenuChoice::Deposit | MenuChoice::Withdraw => {
                    let function = if choice == MenuChoice::Deposit {
                        "deposit"
                    } else {
                        "withdraw"
                    };
                    match prompt_amount(&mut lines, out, function).await? {
                        AmountInput::Amount(amount) => {
                            let output = self.client.invoke(function, &[amount.to_string()]).await;
                            report_ack(out, choice, &output)?;
                        }
                        AmountInput::Cancelled => {}
                        AmountInput::EndOfInput => break,
                    }
                }
                MenuChoice::ShowInfo => writeln!(out, "{}", record_table(&self.record))?,
            }
        }

        writeln!(out, "Goodbye!")?;
        Ok(())
    }

    fn print_menu<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out)?;
        for (key, choice) in MenuChoice::MENU {
            writeln!(out, "{key}. {choice}")?;
        }
        Ok(())
    }

    async fn read_greeting<W: Write>(&self, out: &mut W) -> Result<()> {
        let output = self.client.call("get_greeting", &[]).await;
        let Some(word) = call_result(out, &output)? else {
            return Ok(());
        };

        match codec::decode_word(&word) {
            Ok(greeting) => writeln!(out, "Current greeting: {greeting}")?,
            Err(e) => {
                tracing::warn!(error = %e, %word, "Could not decode greeting");
                writeln!(out, "Raw result: {word}")?;
            }
        }
        Ok(())
    }

    async fn write_greeting<W: Write>(&self, greeting: &str, out: &mut W) -> Result<()> {
        let output = self
            .client
            .invoke("set_greeting", &[codec::encode_text(greeting)])
            .await;
        report_ack(out, MenuChoice::WriteGreeting, &output)
    }

    async fn read_balance<W: Write>(&self, out: &mut W) -> Result<()> {
        let output = self.client.call("get_balance", &[]).await;
        let Some(word) = call_result(out, &output)? else {
            return Ok(());
        };

        let balance = codec::decode_amount(&word).unwrap_or(word);
        writeln!(out, "Current balance: {balance}")?;
        Ok(())
    }
}

/// Write `text`, then read one trimmed line. `None` at end of input.
async fn prompt<I, W>(lines: &mut Lines<I>, out: &mut W, text: &str) -> Result<Option<String>>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{text}")?;
    out.flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

/// Ask for an amount until a valid integer or an empty line is entered.
async fn prompt_amount<I, W>(lines: &mut Lines<I>, out: &mut W, function: &str) -> Result<AmountInput>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let text = format!("Amount to {function} (empty to cancel): ");
        let Some(line) = prompt(lines, out, &text).await? else {
            return Ok(AmountInput::EndOfInput);
        };
        if line.is_empty() {
            return Ok(AmountInput::Cancelled);
        }
        match line.parse::<u128>() {
            Ok(amount) => return Ok(AmountInput::Amount(amount)),
            Err(_) => writeln!(out, "Please enter a valid number")?,
        }
    }
}

/// The result word of a call, or `None` after reporting why there is none.
fn call_result<W: Write>(out: &mut W, output: &StageOutput) -> Result<Option<String>> {
    if !output.success {
        tracing::warn!(error = %output.error_text(), "Contract call failed");
        writeln!(out, "Call failed: {}", output.error_text())?;
        return Ok(None);
    }

    let word = response_word(&output.stdout);
    if word.is_none() {
        writeln!(out, "No result returned")?;
    }
    Ok(word)
}

/// Show the raw acknowledgement of an invoke.
fn report_ack<W: Write>(out: &mut W, choice: MenuChoice, output: &StageOutput) -> Result<()> {
    if output.success {
        writeln!(out, "{choice} succeeded: {}", output.stdout.trim())?;
    } else {
        tracing::warn!(%choice, error = %output.error_text(), "Contract invoke failed");
        writeln!(out, "{choice} failed: {}", output.error_text())?;
    }
    Ok(())
}
