//! VPC and prefix-list lookups
//!
//! The only state read from the account: the VPC's CIDR block (for the
//! canary egress rule) and confirmation that the S3 prefix list exists.

use super::context::AwsContext;
use super::error::{AwsError, classify_aws_error};
use super::lookup_cache::{LookupCache, prefix_list_key, vpc_key};
use crate::config::ConfigurationContext;
use anyhow::{Context, Result};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Looked-up VPC attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcInfo {
    pub vpc_id: String,
    pub cidr_block: String,
}

/// Looked-up managed prefix list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixListInfo {
    pub prefix_list_id: String,
    pub name: String,
}

/// Everything the composers need from the region's network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub vpc: VpcInfo,
    pub prefix_list: PrefixListInfo,
}

/// Trait for network lookups that can be mocked in tests.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait NetworkLookup: Send + Sync {
    /// Look up a VPC by id
    async fn lookup_vpc(&self, vpc_id: &str) -> Result<VpcInfo>;

    /// Look up a managed prefix list by id
    async fn lookup_prefix_list(&self, prefix_list_id: &str) -> Result<PrefixListInfo>;
}

/// EC2 client for network lookups
pub struct Ec2Client {
    client: Client,
}

impl Ec2Client {
    pub fn from_context(aws: &AwsContext) -> Self {
        Self {
            client: aws.ec2().clone(),
        }
    }
}

impl NetworkLookup for Ec2Client {
    async fn lookup_vpc(&self, vpc_id: &str) -> Result<VpcInfo> {
        let output = self
            .client
            .describe_vpcs()
            .vpc_ids(vpc_id)
            .send()
            .await
            .map_err(|e| classify_aws_error(e.code(), e.message()))
            .with_context(|| format!("Failed to describe VPC {vpc_id}"))?;

        let vpc = output.vpcs().first().ok_or_else(|| AwsError::NotFound {
            resource_type: "vpc",
            resource_id: vpc_id.to_string(),
        })?;
        let cidr_block = vpc
            .cidr_block()
            .with_context(|| format!("VPC {vpc_id} has no CIDR block"))?;

        debug!(vpc_id, cidr_block, "Looked up VPC");
        Ok(VpcInfo {
            vpc_id: vpc_id.to_string(),
            cidr_block: cidr_block.to_string(),
        })
    }

    async fn lookup_prefix_list(&self, prefix_list_id: &str) -> Result<PrefixListInfo> {
        let output = self
            .client
            .describe_managed_prefix_lists()
            .prefix_list_ids(prefix_list_id)
            .send()
            .await
            .map_err(|e| classify_aws_error(e.code(), e.message()))
            .with_context(|| format!("Failed to describe prefix list {prefix_list_id}"))?;

        let list = output
            .prefix_lists()
            .first()
            .ok_or_else(|| AwsError::NotFound {
                resource_type: "prefix list",
                resource_id: prefix_list_id.to_string(),
            })?;

        debug!(prefix_list_id, name = ?list.prefix_list_name(), "Looked up prefix list");
        Ok(PrefixListInfo {
            prefix_list_id: prefix_list_id.to_string(),
            name: list.prefix_list_name().unwrap_or_default().to_string(),
        })
    }
}

/// Resolve the network inputs for one context, cache first.
///
/// `live` is `None` for offline runs, where a cache miss is an error. Live
/// results are written into the cache.
pub async fn resolve_network<L: NetworkLookup>(
    ctx: &ConfigurationContext,
    cache: &mut LookupCache,
    live: Option<&L>,
) -> Result<NetworkInfo> {
    let account = ctx.workload_account.as_str();
    let region = ctx.deployment_region.as_str();
    let vpc_id = ctx.network.vpc_id.as_str();
    let prefix_list_id = ctx.network.s3_prefix_list.as_str();

    let vpc = match (cache.vpc(account, region, vpc_id), live) {
        (Some(hit), _) => hit.clone(),
        (None, Some(lookup)) => {
            let info = lookup.lookup_vpc(vpc_id).await?;
            cache.insert_vpc(account, region, info.clone());
            info
        }
        (None, None) => {
            return Err(AwsError::NotCached {
                key: vpc_key(account, region, vpc_id),
            }
            .into());
        }
    };

    let prefix_list = match (cache.prefix_list(account, region, prefix_list_id), live) {
        (Some(hit), _) => hit.clone(),
        (None, Some(lookup)) => {
            let info = lookup.lookup_prefix_list(prefix_list_id).await?;
            cache.insert_prefix_list(account, region, info.clone());
            info
        }
        (None, None) => {
            return Err(AwsError::NotCached {
                key: prefix_list_key(account, region, prefix_list_id),
            }
            .into());
        }
    };

    info!(
        region,
        vpc_id,
        cidr_block = %vpc.cidr_block,
        prefix_list = %prefix_list.prefix_list_id,
        "Resolved network"
    );
    Ok(NetworkInfo { vpc, prefix_list })
}
