use crate::billing::{run_batch, run_preview, BatchArgs, PreviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use upkyp::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "upkyp",
    about = "Compute tenant billing statements and run the Upkyp billing service",
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
    /// Compute billing statements without starting the service
    Billing {
        #[command(subcommand)]
        command: BillingCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BillingCommand {
    /// Print an itemized statement for a single unit
    Preview(PreviewArgs),
    /// Bill every unit listed in a meter reading CSV
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Billing {
            command: BillingCommand::Preview(args),
        } => run_preview(args),
        Command::Billing {
            command: BillingCommand::Batch(args),
        } => run_batch(args),
    }
}
