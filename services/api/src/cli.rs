use crate::demo::{run_verify, VerifyArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use kyc_gateway::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "KYC Verification Gateway",
    about = "Run identity verifications against a KYC vendor from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Verify a single customer against the sandbox vendor and print the result
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Status checks the sandbox vendor answers with "pending" before completing
    #[arg(long, default_value_t = 2)]
    pub(crate) sandbox_polls: u32,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            sandbox_polls: 2,
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Verify(args) => run_verify(args).await,
    }
}
