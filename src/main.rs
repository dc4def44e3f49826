use anyhow::Context;
use clap::Parser;
use secretproof::cli::{Cli, Commands, ConfigAction};
use secretproof::config::{validate_config, validate_config_object, Config};
use secretproof::fingerprint::{FileFingerprintRepository, FingerprintRepository};
use secretproof::logging;
use secretproof::provisioning::{self, ProvisionState};
use secretproof::secrets::{self, Digest, SecretType};
use secretproof::verify::VerificationResult;
use secretproof::workflow::{ProofWorkflow, RunReport};
use tracing::{error, info, warn};

/// Exit status when the consumer did not observe the provisioned digest.
const EXIT_MISMATCH: i32 = 2;
/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// Load config and start logging; the config can ask for JSON logs.
fn load(path: Option<&str>, log_json: bool) -> anyhow::Result<Config> {
    let config = Config::load(path)?;
    logging::init(log_json || config.logging.json);
    Ok(config)
}

fn print_report(report: &RunReport) {
    let v = &report.verification;
    let show = |d: &Option<Digest>| d.as_ref().map(|d| d.to_string()).unwrap_or("-".into());
    println!("consumer:  {}", report.consumer);
    println!("task:      {}", report.consumer_task.task_id);
    println!("expected:  {}", show(&v.expected_digest));
    println!("observed:  {}", show(&v.observed_digest));
    println!("reuse:     {}", v.is_reuse);
    match v.reason {
        None => println!("result:    MATCH"),
        Some(reason) => println!("result:    NO MATCH ({reason})"),
    }
    if let Some(ref caveat) = report.caveat {
        println!("caveat:    {caveat}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(opts) => {
            let config = load(opts.config.as_deref(), cli.log_json)?;
            validate_config_object(&config)?;
            let workflow = ProofWorkflow::from_config(&config)?;

            info!("Starting proof run for {}", opts.consumer);
            let report = tokio::select! {
                report = workflow.run(&opts.consumer) => report.map_err(|e| {
                    error!("Run failed [{}]: {}", e.code(), e);
                    e
                })?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted; any submitted execution keeps running remotely");
                    std::process::exit(EXIT_INTERRUPTED);
                }
            };

            if opts.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if !report.verification.matched {
                std::process::exit(EXIT_MISMATCH);
            }
        }
        Commands::Status(opts) => {
            let config = load(opts.config.as_deref(), cli.log_json)?;
            let repository = FileFingerprintRepository::new(config.fingerprint_path());
            let state = provisioning::decide(&repository, &opts.consumer)?;
            println!("{state}");
            if let ProvisionState::Reuse(ref record) = state {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
        }
        Commands::Generate(opts) => {
            logging::init(cli.log_json);
            let kind: SecretType = opts.secret_type.parse().unwrap_or_default();
            let secret = secrets::generate(kind);
            println!("{}", serde_json::to_string_pretty(&secret.summary())?);
        }
        Commands::Verify(opts) => {
            logging::init(cli.log_json);
            let result = VerificationResult::new(
                Digest::from_reported(&opts.expected),
                Digest::from_reported(&opts.observed),
                false,
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.matched {
                std::process::exit(EXIT_MISMATCH);
            }
        }
        Commands::Reset(opts) => {
            let config = load(opts.config.as_deref(), cli.log_json)?;
            let repository = FileFingerprintRepository::new(config.fingerprint_path());
            if repository.clear()? {
                info!("Removed {}", repository.path().display());
            } else {
                info!("No fingerprint stored at {}", repository.path().display());
            }
        }
        Commands::Config(opts) => match opts.action {
            ConfigAction::Show => {
                let config = load(opts.config.as_deref(), cli.log_json)?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                let config = load(opts.config.as_deref(), cli.log_json)?;
                let mut problems: Vec<String> =
                    validate_config(&config).iter().map(|e| e.to_string()).collect();
                if let Err(e) = config.require_credentials() {
                    problems.push(e.to_string());
                }
                if !problems.is_empty() {
                    anyhow::bail!("Configuration validation failed:\n{}", problems.join("\n"));
                }
                info!("Configuration is valid");
            }
            ConfigAction::Init => {
                // The target file does not exist yet, so nothing is loaded.
                logging::init(cli.log_json);
                let path = opts.config.as_deref().unwrap_or("secretproof.json");
                Config::write_default(path).with_context(|| format!("initializing {path}"))?;
                info!("Configuration file created at {}", path);
            }
        },
        Commands::Version => {
            println!("secretproof {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
