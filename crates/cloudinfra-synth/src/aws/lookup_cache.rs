//! Persistent lookup cache
//!
//! Results of live VPC and prefix-list lookups are stored in a JSON file
//! keyed by account, region and resource id. A populated cache makes
//! synthesis reproducible and lets `--offline` runs skip AWS entirely.

use super::ec2::{PrefixListInfo, VpcInfo};
use crate::config::ConfigurationContext;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A cached lookup result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CachedValue {
    Vpc(VpcInfo),
    PrefixList(PrefixListInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub looked_up_at: DateTime<Utc>,
    pub value: CachedValue,
}

/// Lookup results keyed by `{kind}:{account}:{region}:{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupCache {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
    #[serde(skip)]
    dirty: bool,
}

pub fn vpc_key(account: &str, region: &str, vpc_id: &str) -> String {
    format!("vpc:{account}:{region}:{vpc_id}")
}

pub fn prefix_list_key(account: &str, region: &str, prefix_list_id: &str) -> String {
    format!("prefix-list:{account}:{region}:{prefix_list_id}")
}

impl LookupCache {
    /// Load a cache file; a missing file is an empty cache
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No lookup cache, starting empty");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lookup cache {}", path.display()))?;
        let cache: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse lookup cache {}", path.display()))?;
        debug!(path = %path.display(), entries = cache.entries.len(), "Loaded lookup cache");
        Ok(cache)
    }

    /// Write the cache back if anything was added since it was loaded
    pub fn save(&mut self, path: &Path) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write lookup cache {}", path.display()))?;
        self.dirty = false;
        debug!(path = %path.display(), entries = self.entries.len(), "Saved lookup cache");
        Ok(true)
    }

    pub fn vpc(&self, account: &str, region: &str, vpc_id: &str) -> Option<&VpcInfo> {
        match self.entries.get(&vpc_key(account, region, vpc_id)) {
            Some(CacheEntry {
                value: CachedValue::Vpc(info),
                ..
            }) => Some(info),
            _ => None,
        }
    }

    pub fn prefix_list(
        &self,
        account: &str,
        region: &str,
        prefix_list_id: &str,
    ) -> Option<&PrefixListInfo> {
        match self
            .entries
            .get(&prefix_list_key(account, region, prefix_list_id))
        {
            Some(CacheEntry {
                value: CachedValue::PrefixList(info),
                ..
            }) => Some(info),
            _ => None,
        }
    }

    /// Whether every lookup the context needs is already cached
    pub fn covers(&self, ctx: &ConfigurationContext) -> bool {
        let account = ctx.workload_account.as_str();
        let region = ctx.deployment_region.as_str();
        self.vpc(account, region, &ctx.network.vpc_id).is_some()
            && self
                .prefix_list(account, region, &ctx.network.s3_prefix_list)
                .is_some()
    }

    pub fn insert_vpc(&mut self, account: &str, region: &str, info: VpcInfo) {
        let key = vpc_key(account, region, &info.vpc_id);
        self.insert(key, CachedValue::Vpc(info));
    }

    pub fn insert_prefix_list(&mut self, account: &str, region: &str, info: PrefixListInfo) {
        let key = prefix_list_key(account, region, &info.prefix_list_id);
        self.insert(key, CachedValue::PrefixList(info));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, value: CachedValue) {
        self.entries.insert(
            key,
            CacheEntry {
                looked_up_at: Utc::now(),
                value,
            },
        );
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sample_context, sample_network};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = LookupCache::load(&dir.path().join("absent.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cloudinfra.context.json");
        let network = sample_network();

        let mut cache = LookupCache::default();
        cache.insert_vpc("123456789012", "eu-central-1", network.vpc.clone());
        cache.insert_prefix_list("123456789012", "eu-central-1", network.prefix_list.clone());
        assert!(cache.save(&path).unwrap());
        assert!(!cache.save(&path).unwrap(), "clean cache is not rewritten");

        let reloaded = LookupCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.vpc("123456789012", "eu-central-1", "vpc-0abc123"),
            Some(&network.vpc)
        );
        assert_eq!(
            reloaded.prefix_list("123456789012", "eu-central-1", "pl-6ea54007"),
            Some(&network.prefix_list)
        );
    }

    #[test]
    fn test_keys_are_region_scoped() {
        let mut cache = LookupCache::default();
        cache.insert_vpc("123456789012", "eu-central-1", sample_network().vpc);
        assert!(cache.vpc("123456789012", "us-east-1", "vpc-0abc123").is_none());
        assert!(cache.prefix_list("123456789012", "eu-central-1", "vpc-0abc123").is_none());
    }

    #[test]
    fn test_covers_needs_both_lookups() {
        let ctx = sample_context("eu-central-1");
        let mut cache = LookupCache::default();
        cache.insert_vpc("123456789012", "eu-central-1", sample_network().vpc);
        assert!(!cache.covers(&ctx));
        cache.insert_prefix_list("123456789012", "eu-central-1", sample_network().prefix_list);
        assert!(cache.covers(&ctx));
        assert!(!cache.covers(&sample_context("us-east-1")));
    }

    #[test]
    fn test_corrupt_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        let err = LookupCache::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse lookup cache"));
    }
}
