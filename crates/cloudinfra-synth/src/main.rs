//! cloudinfra: synthesize canary and fault injection infrastructure
//!
//! Reads one INI profile per region plus the branch's application list and
//! writes one CloudFormation template per region.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cloudinfra_common::defaults::{
    BRANCH_ENV_VAR, DEFAULT_BRANCH, DEFAULT_LOOKUP_CACHE, DEFAULT_OUT_DIR, app_list_path,
};
use cloudinfra_synth::catalog::{ExperimentCatalog, ExperimentKind};
use cloudinfra_synth::config::RegionProfiles;
use cloudinfra_synth::config::profile::parse_region_profile;
use cloudinfra_synth::synth::{self, SynthConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cloudinfra")]
#[command(about = "Synthesize multi-region canary and fault injection stacks")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Inputs shared by every subcommand
#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Branch whose profile sections are used
    #[arg(long, env = BRANCH_ENV_VAR, default_value = DEFAULT_BRANCH)]
    branch: String,

    /// Region profile as REGION=PATH; repeat for each region, primary first
    /// (default: the built-in eu-central-1 and us-east-1 profiles)
    #[arg(long = "region", value_name = "REGION=PATH", value_parser = parse_region_profile)]
    regions: Vec<(String, PathBuf)>,

    /// Directory holding the default region profiles
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Application list (default: config/canary_app_list_{branch}.json)
    #[arg(long)]
    apps: Option<PathBuf>,

    /// Lookup cache file
    #[arg(long, default_value = DEFAULT_LOOKUP_CACHE)]
    cache: PathBuf,

    /// Never call AWS; every lookup must be cached
    #[arg(long)]
    offline: bool,

    /// Enable an experiment family that is off by default
    #[arg(long, value_name = "KIND", value_parser = parse_experiment_kind)]
    enable: Vec<ExperimentKind>,

    /// Disable an experiment family that is on by default
    #[arg(long, value_name = "KIND", value_parser = parse_experiment_kind)]
    disable: Vec<ExperimentKind>,
}

impl TryFrom<InputArgs> for SynthConfig {
    type Error = anyhow::Error;

    fn try_from(args: InputArgs) -> Result<Self> {
        let profiles = if args.regions.is_empty() {
            RegionProfiles::defaults(&args.config_dir)
        } else {
            RegionProfiles::new(args.regions)?
        };
        let apps_path = args
            .apps
            .unwrap_or_else(|| args.config_dir.join(app_list_path(&args.branch)));

        let mut catalog = ExperimentCatalog::default();
        for kind in args.enable {
            catalog = catalog.with(kind, true);
        }
        for kind in args.disable {
            catalog = catalog.with(kind, false);
        }

        Ok(Self {
            branch: args.branch,
            profiles,
            apps_path,
            cache_path: args.cache,
            offline: args.offline,
            catalog,
        })
    }
}

fn parse_experiment_kind(s: &str) -> Result<ExperimentKind, String> {
    s.parse().map_err(|_| {
        use strum::IntoEnumIterator;
        let known: Vec<_> = ExperimentKind::iter().map(|k| k.to_string()).collect();
        format!("unknown experiment kind '{s}' (expected one of: {})", known.join(", "))
    })
}

/// Arguments for the synth command
#[derive(clap::Args, Debug)]
struct SynthArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output directory
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,
}

/// Arguments for the plan command
#[derive(clap::Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output format (table, json)
    #[arg(long, default_value = "table")]
    format: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write one template per region plus manifest.json
    Synth(Box<SynthArgs>),

    /// Print the resources each stack would contain, without writing
    Plan(Box<PlanArgs>),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<cloudinfra_synth::aws::AwsError>())
        .and_then(|aws| aws.suggestion())
    {
        let _ = writeln!(stderr, "\n\x1b[2mHint:\x1b[0m {hint}");
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
                .add_directive("aws_config=warn".parse()?)
                .add_directive("aws_sdk_ec2=warn".parse()?)
                .add_directive("aws_sdk_sts=warn".parse()?)
                .add_directive("aws_smithy_runtime=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Synth(args) => {
            let SynthArgs { inputs, out } = *args;
            let config = SynthConfig::try_from(inputs)?;
            info!(branch = %config.branch, offline = config.offline, "Starting synthesis");
            let written = synth::run_synth(&config, &out).await?;
            for path in &written {
                println!("{}", path.display());
            }
        }

        Command::Plan(args) => {
            let PlanArgs { inputs, format } = *args;
            let config = SynthConfig::try_from(inputs)?;
            handle_plan(&config, &format).await?;
        }
    }

    Ok(())
}

/// Handle the plan command
async fn handle_plan(config: &SynthConfig, format: &str) -> Result<()> {
    let assembly = synth::synthesize(config).await?;

    if format == "json" {
        let stacks: Vec<_> = assembly
            .stacks()
            .iter()
            .map(|stack| {
                serde_json::json!({
                    "stack": stack.name(),
                    "region": stack.region(),
                    "primary": stack.is_primary(),
                    "resources": stack
                        .resources()
                        .iter()
                        .map(|r| serde_json::json!({
                            "kind": r.kind(),
                            "name": r.name(),
                            "logical_id": r.logical_id(),
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&stacks)?);
        return Ok(());
    }

    for stack in assembly.stacks() {
        let role = if stack.is_primary() { "primary" } else { "secondary" };
        println!("{} ({}, {role})", stack.name(), stack.region());
        println!("{:<20} {:<60}", "KIND", "NAME");
        println!("{}", "-".repeat(80));
        for resource in stack.resources() {
            println!("{:<20} {:<60}", resource.kind().to_string(), resource.name());
        }
        println!();
    }
    println!(
        "{} stacks, {} resources",
        assembly.stacks().len(),
        assembly
            .stacks()
            .iter()
            .map(|s| s.resources().len())
            .sum::<usize>()
    );
    Ok(())
}
