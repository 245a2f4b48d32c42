//! Configuration resolution
//!
//! Region profiles (INI, one section per branch) and the per-branch
//! application list are merged into one immutable [`ConfigurationContext`]
//! per region. Every key a composer reads is parsed and validated here, so
//! composition itself cannot fail on configuration.

pub mod apps;
pub mod error;
pub mod profile;

pub use apps::{ApplicationDescriptor, load_applications};
pub use error::ConfigError;
pub use profile::{RegionProfiles, resolve, resolve_all};

use cloudinfra_common::defaults::DEFAULT_PRODUCT;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Profile keys read by the synthesizer
pub mod keys {
    pub const RESOURCE_PREFIX: &str = "resource_prefix";
    pub const SERVICE_NAME: &str = "service_name";
    pub const APP_ENV: &str = "app_env";
    pub const APP_NAME: &str = "app_name";
    pub const RESOURCE_SUFFIX: &str = "resource_suffix";
    pub const WORKLOAD_ACCOUNT: &str = "workload_account";
    pub const ASSET_PREFIX: &str = "asset_prefix";
    pub const COST_CENTER: &str = "cost_center";
    pub const VPC_ID: &str = "vpc_id";
    pub const SUBNET_AZ1_LIST: &str = "subnet_az1_list";
    pub const SUBNET_AZ2_LIST: &str = "subnet_az2_list";
    pub const AZ1_NAME: &str = "az1_name";
    pub const AZ2_NAME: &str = "az2_name";
    pub const S3_PREFIX_LIST: &str = "s3_prefix_list";
    pub const DB_CLUSTERS: &str = "db_clusters";
    pub const ECS_SERVICES: &str = "ecs_services";
    /// Spelled as it appears in existing profiles
    pub const ECS_TASK_PERCENTS: &str = "ecs_taks_percents";
    pub const ECS_DRAIN_PERCENTS: &str = "ecs_drain_percents";
    pub const ECS_CLUSTER_NAME: &str = "ecs_cluster_name";
    pub const PRODUCT: &str = "product";

    /// Injected by the resolver, never read from a profile
    pub const DEPLOYMENT_REGION: &str = "deployment_region";
    /// Injected by the resolver, never read from a profile
    pub const PRIMARY_REGION: &str = "primary_region";
}

/// Keys that end up inside composed names and must be name-safe
const IDENTITY_KEYS: &[&str] = &[
    keys::RESOURCE_PREFIX,
    keys::SERVICE_NAME,
    keys::APP_ENV,
    keys::APP_NAME,
    keys::RESOURCE_SUFFIX,
    keys::ASSET_PREFIX,
];

/// An ECS task percentage, normalized so "50" and "050" are the same value
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, Serialize,
)]
pub struct Percent(u8);

impl Percent {
    /// Create a percentage in 1..=100
    pub fn new(value: u8) -> Option<Self> {
        (1..=100).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// One availability zone's failure-experiment inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzSettings {
    /// AZ identifier passed to RDS/ElastiCache targets (e.g. "euc1-az1")
    pub name: String,
    /// Subnets whose connectivity is disrupted
    pub subnets: Vec<String>,
}

/// Network inputs for the region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub vpc_id: String,
    pub s3_prefix_list: String,
    pub az1: AzSettings,
    pub az2: AzSettings,
}

/// Resolved configuration for one (branch, region) pair
///
/// Built once per region before composition and never mutated afterwards.
/// The raw key/value map is kept alongside the typed view so optional keys
/// read by disabled catalog entries remain reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationContext {
    pub branch: String,
    pub resource_prefix: String,
    pub service_name: String,
    pub app_env: String,
    pub app_name: String,
    pub resource_suffix: String,
    pub workload_account: String,
    pub deployment_region: String,
    pub primary_region: String,
    pub asset_prefix: String,
    pub cost_center: String,
    pub product: String,
    pub network: NetworkSettings,
    pub db_clusters: Vec<String>,
    pub ecs_services: Vec<String>,
    pub ecs_task_percents: Vec<Percent>,
    values: BTreeMap<String, String>,
}

impl ConfigurationContext {
    /// Build a context from a merged key/value map.
    ///
    /// `values` must already contain `deployment_region` and
    /// `primary_region`. Fails on the first missing or invalid key.
    pub fn from_values(
        branch: impl Into<String>,
        values: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let region = values
            .get(keys::DEPLOYMENT_REGION)
            .cloned()
            .unwrap_or_default();
        let raw = RawValues {
            values: &values,
            region: &region,
        };

        for key in IDENTITY_KEYS {
            check_name_safe(key, raw.required(key)?, &region)?;
        }
        // Every composed name, and so every template logical id, starts with it
        let resource_prefix = raw.required(keys::RESOURCE_PREFIX)?;
        if !resource_prefix.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(ConfigError::invalid(
                keys::RESOURCE_PREFIX,
                &region,
                format!("'{resource_prefix}' must start with a letter"),
            ));
        }
        let workload_account = raw.required(keys::WORKLOAD_ACCOUNT)?;
        if workload_account.len() != 12 || !workload_account.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::invalid(
                keys::WORKLOAD_ACCOUNT,
                &region,
                "account id must be 12 digits",
            ));
        }

        let s3_prefix_list = raw.required(keys::S3_PREFIX_LIST)?;
        if !is_prefixed_id(s3_prefix_list, "pl-") {
            return Err(ConfigError::invalid(
                keys::S3_PREFIX_LIST,
                &region,
                format!("'{s3_prefix_list}' is not a prefix list id"),
            ));
        }
        let vpc_id = raw.required(keys::VPC_ID)?;
        if !is_prefixed_id(vpc_id, "vpc-") {
            return Err(ConfigError::invalid(
                keys::VPC_ID,
                &region,
                format!("'{vpc_id}' is not a VPC id"),
            ));
        }

        let network = NetworkSettings {
            vpc_id: vpc_id.to_string(),
            s3_prefix_list: s3_prefix_list.to_string(),
            az1: AzSettings {
                name: raw.required(keys::AZ1_NAME)?.to_string(),
                subnets: raw.list(keys::SUBNET_AZ1_LIST)?,
            },
            az2: AzSettings {
                name: raw.required(keys::AZ2_NAME)?.to_string(),
                subnets: raw.list(keys::SUBNET_AZ2_LIST)?,
            },
        };

        let db_clusters = raw.list(keys::DB_CLUSTERS)?;
        let ecs_services = raw.list(keys::ECS_SERVICES)?;
        for name in &db_clusters {
            check_name_safe(keys::DB_CLUSTERS, name, &region)?;
        }
        for name in &ecs_services {
            check_name_safe(keys::ECS_SERVICES, name, &region)?;
        }
        let ecs_task_percents = raw.percents(keys::ECS_TASK_PERCENTS)?;

        let product = values
            .get(keys::PRODUCT)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PRODUCT);
        check_name_safe(keys::PRODUCT, product, &region)?;

        Ok(Self {
            branch: branch.into(),
            resource_prefix: resource_prefix.to_string(),
            service_name: raw.required(keys::SERVICE_NAME)?.to_string(),
            app_env: raw.required(keys::APP_ENV)?.to_string(),
            app_name: raw.required(keys::APP_NAME)?.to_string(),
            resource_suffix: raw.required(keys::RESOURCE_SUFFIX)?.to_string(),
            workload_account: workload_account.to_string(),
            deployment_region: raw.required(keys::DEPLOYMENT_REGION)?.to_string(),
            primary_region: raw.required(keys::PRIMARY_REGION)?.to_string(),
            asset_prefix: raw.required(keys::ASSET_PREFIX)?.to_string(),
            cost_center: raw.required(keys::COST_CENTER)?.to_string(),
            product: product.to_string(),
            network,
            db_clusters,
            ecs_services,
            ecs_task_percents,
            values,
        })
    }

    /// Raw value for a key, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parse an optional-by-default percentage list; absent is an error.
    ///
    /// Used by catalog entries whose keys are only required when enabled.
    pub fn required_percents(&self, key: &str) -> Result<Vec<Percent>, ConfigError> {
        self.raw().percents(key)
    }

    /// ECS cluster targeted by task experiments
    pub fn ecs_cluster_name(&self) -> String {
        self.get(keys::ECS_CLUSTER_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{}-{}-{}-ecs-cluster-{}",
                    self.resource_prefix, self.service_name, self.app_env, self.resource_suffix
                )
            })
    }

    fn raw(&self) -> RawValues<'_> {
        RawValues {
            values: &self.values,
            region: &self.deployment_region,
        }
    }
}

impl fmt::Display for ConfigurationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.branch, self.deployment_region)
    }
}

/// Borrowed key/value lookups with region-tagged errors
struct RawValues<'a> {
    values: &'a BTreeMap<String, String>,
    region: &'a str,
}

impl<'a> RawValues<'a> {
    fn required(&self, key: &str) -> Result<&'a str, ConfigError> {
        match self.values.get(key).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ConfigError::MissingKey {
                key: key.to_string(),
                region: self.region.to_string(),
            }),
        }
    }

    /// Comma-separated list; items trimmed, empty items and duplicates rejected
    fn list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        let raw = self.required(key)?;
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for item in raw.split(',').map(str::trim) {
            if item.is_empty() {
                return Err(ConfigError::invalid(key, self.region, "empty list item"));
            }
            if !seen.insert(item) {
                return Err(ConfigError::DuplicateParameter {
                    key: key.to_string(),
                    value: item.to_string(),
                });
            }
            items.push(item.to_string());
        }
        Ok(items)
    }

    /// Comma-separated percentages, duplicates detected after normalization
    fn percents(&self, key: &str) -> Result<Vec<Percent>, ConfigError> {
        let mut seen = HashSet::new();
        let mut percents = Vec::new();
        for item in self.list(key)? {
            let percent = item
                .parse::<u8>()
                .ok()
                .and_then(Percent::new)
                .ok_or_else(|| {
                    ConfigError::invalid(key, self.region, format!("'{item}' is not in 1..=100"))
                })?;
            if !seen.insert(percent) {
                return Err(ConfigError::DuplicateParameter {
                    key: key.to_string(),
                    value: item,
                });
            }
            percents.push(percent);
        }
        Ok(percents)
    }
}

fn check_name_safe(key: &str, value: &str, region: &str) -> Result<(), ConfigError> {
    if value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            key,
            region,
            format!("'{value}' may only contain ASCII letters, digits and '-'"),
        ))
    }
}

fn is_prefixed_id(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_values;

    #[test]
    fn test_from_values_parses_lists() {
        let ctx =
            ConfigurationContext::from_values("dev", sample_values("eu-central-1", "eu-central-1"))
                .unwrap();
        assert_eq!(ctx.ecs_services, vec!["svc-a", "svc-b"]);
        assert_eq!(
            ctx.ecs_task_percents,
            vec![Percent::new(25).unwrap(), Percent::new(50).unwrap()]
        );
        assert_eq!(ctx.network.az1.subnets, vec!["subnet-0a1", "subnet-0a2"]);
        assert_eq!(ctx.product, "mra");
        assert_eq!(ctx.to_string(), "dev@eu-central-1");
    }

    #[test]
    fn test_missing_vpc_id_fails() {
        let mut values = sample_values("us-east-1", "eu-central-1");
        values.remove("vpc_id");
        let err = ConfigurationContext::from_values("dev", values).unwrap_err();
        assert!(
            matches!(&err, ConfigError::MissingKey { key, region } if key == "vpc_id" && region == "us-east-1"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_prefix_must_start_with_letter() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("resource_prefix".to_string(), "9sw".to_string());
        let err = ConfigurationContext::from_values("dev", values).unwrap_err();
        assert!(
            matches!(&err, ConfigError::InvalidValue { key, .. } if key == "resource_prefix"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_blank_value_is_missing() {
        let mut values = sample_values("us-east-1", "eu-central-1");
        values.insert("cost_center".to_string(), "  ".to_string());
        let err = ConfigurationContext::from_values("dev", values).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn test_normalized_percent_duplicates_rejected() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("ecs_taks_percents".to_string(), "50, 050".to_string());
        let err = ConfigurationContext::from_values("dev", values).unwrap_err();
        assert!(
            matches!(&err, ConfigError::DuplicateParameter { key, value } if key == "ecs_taks_percents" && value == "050"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_percent_out_of_range() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("ecs_taks_percents".to_string(), "0".to_string());
        assert!(matches!(
            ConfigurationContext::from_values("dev", values),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("ecs_services".to_string(), "svc-a, svc-a".to_string());
        assert!(matches!(
            ConfigurationContext::from_values("dev", values),
            Err(ConfigError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_empty_list_item_rejected() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("db_clusters".to_string(), "orders-db,,users-db".to_string());
        assert!(matches!(
            ConfigurationContext::from_values("dev", values),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_identity_key_with_whitespace_rejected() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("app_name".to_string(), "my app".to_string());
        assert!(matches!(
            ConfigurationContext::from_values("dev", values),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_bad_account_rejected() {
        let mut values = sample_values("eu-central-1", "eu-central-1");
        values.insert("workload_account".to_string(), "12345".to_string());
        assert!(matches!(
            ConfigurationContext::from_values("dev", values),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_optional_drain_percents() {
        let ctx =
            ConfigurationContext::from_values("dev", sample_values("eu-central-1", "eu-central-1"))
                .unwrap();
        assert!(matches!(
            ctx.required_percents(keys::ECS_DRAIN_PERCENTS),
            Err(ConfigError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_default_ecs_cluster_name() {
        let ctx =
            ConfigurationContext::from_values("dev", sample_values("eu-central-1", "eu-central-1"))
                .unwrap();
        assert_eq!(ctx.ecs_cluster_name(), "sw-resil-dev-ecs-cluster-01");
    }
}
