use crate::admin::{run_hash_password, HashPasswordArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use innovision::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "InnoVision Enrollment Service",
    about = "Run the InnoVision School enrollment and admin API",
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
    /// Administrator provisioning helpers
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Print an argon2 hash for ADMIN_PASSWORD_HASH
    HashPassword(HashPasswordArgs),
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
        Command::Admin {
            command: AdminCommand::HashPassword(args),
        } => run_hash_password(args),
    }
}
