//! Synthesis driver
//!
//! Runs the pipeline end to end: resolve every region's configuration and
//! the application list, resolve network lookups (cache first), compose one
//! stack per region, then assemble and write. Every fallible input step
//! completes for all regions before any stack is composed, so a failure in
//! one region leaves the output directory untouched.

use crate::aws::{
    AwsContext, Ec2Client, LookupCache, NetworkInfo, resolve_network, verify_account,
};
use crate::catalog::{ExperimentCatalog, plan_canaries};
use crate::compose::{artifact_bucket_names, compose_stack};
use crate::config::{
    ApplicationDescriptor, ConfigurationContext, RegionProfiles, load_applications, resolve_all,
};
use crate::error::ComposeError;
use crate::manifest::Assembly;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything one synthesis run needs
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub branch: String,
    pub profiles: RegionProfiles,
    pub apps_path: PathBuf,
    pub cache_path: PathBuf,
    /// Forbid live AWS lookups; a cache miss is an error
    pub offline: bool,
    pub catalog: ExperimentCatalog,
}

/// Resolved configuration for every region plus the application list
#[derive(Debug, Clone)]
pub struct Inputs {
    pub contexts: Vec<ConfigurationContext>,
    pub apps: Vec<ApplicationDescriptor>,
}

/// Resolve every region and the application list; all or nothing
pub fn load_inputs(config: &SynthConfig) -> Result<Inputs> {
    let contexts = resolve_all(&config.branch, &config.profiles)?;
    let apps = load_applications(&config.apps_path)?;
    info!(
        branch = %config.branch,
        regions = contexts.len(),
        primary = %config.profiles.primary(),
        applications = apps.len(),
        "Resolved configuration"
    );
    Ok(Inputs { contexts, apps })
}

/// Resolve the network inputs of every region, in region order.
///
/// Regions fully served by the cache never touch AWS, so the account check
/// only runs for regions that need a live lookup.
pub async fn resolve_networks(
    contexts: &[ConfigurationContext],
    cache: &mut LookupCache,
    offline: bool,
) -> Result<Vec<NetworkInfo>> {
    let mut networks = Vec::with_capacity(contexts.len());
    for ctx in contexts {
        let network = if offline || cache.covers(ctx) {
            debug!(%ctx, "Resolving network from lookup cache");
            resolve_network::<Ec2Client>(ctx, cache, None).await
        } else {
            let aws = AwsContext::new(&ctx.deployment_region).await;
            verify_account(&aws, &ctx.workload_account).await?;
            let ec2 = Ec2Client::from_context(&aws);
            resolve_network(ctx, cache, Some(&ec2)).await
        };
        networks.push(network.with_context(|| format!("Failed to resolve network for {ctx}"))?);
    }
    Ok(networks)
}

/// Compose and assemble every region's stack.
///
/// `networks` is parallel to `inputs.contexts`.
pub fn assemble(
    branch: &str,
    inputs: &Inputs,
    networks: &[NetworkInfo],
    catalog: &ExperimentCatalog,
) -> Result<Assembly, ComposeError> {
    let canaries = plan_canaries(&inputs.apps);
    let bucket_names = artifact_bucket_names(&inputs.contexts);

    let mut assembly = Assembly::new(branch);
    for (index, ctx) in inputs.contexts.iter().enumerate() {
        let network = networks
            .get(index)
            .ok_or_else(|| ComposeError::UnknownRegion(ctx.deployment_region.clone()))?;
        let stack = compose_stack(ctx, catalog, &canaries, network, &bucket_names)?;
        assembly.add_stack(stack)?;
    }
    Ok(assembly)
}

/// Run every step up to, but not including, writing the output
pub async fn synthesize(config: &SynthConfig) -> Result<Assembly> {
    let inputs = load_inputs(config)?;

    let mut cache = LookupCache::load(&config.cache_path)?;
    let networks = resolve_networks(&inputs.contexts, &mut cache, config.offline).await;
    // Persist whatever was looked up, even when a later region failed
    if cache.save(&config.cache_path)? {
        info!(path = %config.cache_path.display(), entries = cache.len(), "Updated lookup cache");
    }
    let networks = networks?;

    let assembly = assemble(&config.branch, &inputs, &networks, &config.catalog)?;
    Ok(assembly)
}

/// Synthesize and write templates plus manifest into `out_dir`
pub async fn run_synth(config: &SynthConfig, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let assembly = synthesize(config).await?;
    let written = assembly.write(out_dir)?;
    info!(
        out_dir = %out_dir.display(),
        stacks = assembly.stacks().len(),
        files = written.len(),
        "Synthesis complete"
    );
    Ok(written)
}
