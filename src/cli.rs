use clap::{Parser, Subcommand};

/// Shift ledger: job sessions and earnings accrual
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind, overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on, overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Apply database migrations and exit
    Migrate,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { bind: None, port: None })
    }
}
