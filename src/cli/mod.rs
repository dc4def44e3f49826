use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "secretproof",
    version,
    about = "Provision a secret for a confidential app and prove it arrived"
)]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "SECRETPROOF_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision (or reuse) and verify the secret for a consumer.
    Run(RunOpts),
    /// Show whether the next run would provision or reuse.
    Status(StatusOpts),
    /// Generate a secret and print its description, never its value.
    Generate(GenerateOpts),
    /// Compare two digests offline.
    Verify(VerifyOpts),
    /// Forget the stored fingerprint.
    Reset(ResetOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args)]
pub struct RunOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    /// Consumer identity (`0x` address).
    pub consumer: String,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args)]
pub struct StatusOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    pub consumer: String,
}

#[derive(clap::Args)]
pub struct GenerateOpts {
    /// Secret type; unknown names fall back to `random`.
    #[arg(short = 't', long = "type", default_value = "random")]
    pub secret_type: String,
}

#[derive(clap::Args)]
pub struct VerifyOpts {
    pub expected: String,
    pub observed: String,
}

#[derive(clap::Args)]
pub struct ResetOpts {
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[arg(short, long)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}
