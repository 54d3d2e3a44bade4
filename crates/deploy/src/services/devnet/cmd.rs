//! Command builder for the local devnet node.

/// Builder for devnet launch commands.
#[derive(Debug, Clone)]
pub struct DevnetCmdBuilder {
    binary: String,
    host: String,
    port: u16,
    seed: u64,
    accounts: u32,
    initial_balance: String,
    extra_args: Vec<String>,
}

impl DevnetCmdBuilder {
    /// Create a new devnet command builder.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            host: "127.0.0.1".to_string(),
            port: 5050,
            seed: 42,
            accounts: 10,
            initial_balance: "1000000000000000000000".to_string(),
            extra_args: Vec::new(),
        }
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the seed that derives the pre-funded accounts.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of pre-funded accounts.
    pub fn accounts(mut self, accounts: u32) -> Self {
        self.accounts = accounts;
        self
    }

    /// Set the initial balance of each account (decimal, in the fee token's smallest unit).
    pub fn initial_balance(mut self, balance: impl Into<String>) -> Self {
        self.initial_balance = balance.into();
        self
    }

    /// Add extra arguments.
    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Build the command as an argv vector, binary first.
    pub fn build(self) -> Vec<String> {
        let mut cmd = vec![
            self.binary,
            "--host".to_string(),
            self.host,
            "--port".to_string(),
            self.port.to_string(),
            "--seed".to_string(),
            self.seed.to_string(),
            "--accounts".to_string(),
            self.accounts.to_string(),
            "--initial-balance".to_string(),
            self.initial_balance,
        ];

        cmd.extend(self.extra_args);

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devnet_cmd_builder() {
        let cmd = DevnetCmdBuilder::new("starknet-devnet")
            .port(5051)
            .seed(7)
            .build();

        assert_eq!(cmd[0], "starknet-devnet");
        assert!(cmd.windows(2).any(|w| w == ["--port", "5051"]));
        assert!(cmd.windows(2).any(|w| w == ["--seed", "7"]));
        assert!(cmd.windows(2).any(|w| w == ["--accounts", "10"]));
        assert!(
            cmd.windows(2)
                .any(|w| w == ["--initial-balance", "1000000000000000000000"])
        );
    }
}
