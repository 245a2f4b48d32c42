//! Region profile loading
//!
//! Each region has an INI profile with one section per branch. A `DEFAULT`
//! section, when present, supplies values every branch section inherits.
//! Keys are matched case-insensitively.

use super::{ConfigError, ConfigurationContext, keys};
use cloudinfra_common::defaults::DEFAULT_REGION_PROFILES;
use ini::Ini;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Section whose keys are inherited by every branch section
const DEFAULT_SECTION: &str = "DEFAULT";

/// Ordered region → profile mapping. The first region is the primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionProfiles {
    entries: Vec<(String, PathBuf)>,
}

impl RegionProfiles {
    /// Create a mapping; fails when empty or when a region repeats
    pub fn new(entries: Vec<(String, PathBuf)>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::NoRegions);
        }
        let mut seen = HashSet::new();
        for (region, _) in &entries {
            if !seen.insert(region.as_str()) {
                return Err(ConfigError::DuplicateParameter {
                    key: "region".to_string(),
                    value: region.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// The built-in mapping, with profile paths resolved against `base_dir`
    pub fn defaults(base_dir: &Path) -> Self {
        Self {
            entries: DEFAULT_REGION_PROFILES
                .iter()
                .map(|(region, file)| (region.to_string(), base_dir.join(file)))
                .collect(),
        }
    }

    /// Region responsible for account-global resources
    pub fn primary(&self) -> &str {
        // `new` and `defaults` never produce an empty mapping
        self.entries.first().map(|(r, _)| r.as_str()).unwrap_or_default()
    }

    /// Regions in deployment order
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(r, _)| r.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(r, p)| (r.as_str(), p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a `REGION=PATH` pair as given on the command line
pub fn parse_region_profile(s: &str) -> Result<(String, PathBuf), String> {
    let (region, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected REGION=PATH, got '{s}'"))?;
    let region = region.trim();
    if region.is_empty() || path.trim().is_empty() {
        return Err(format!("expected REGION=PATH, got '{s}'"));
    }
    Ok((region.to_string(), PathBuf::from(path.trim())))
}

/// Load one branch section from a profile file, merged over `DEFAULT`
pub fn load_section(path: &Path, branch: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let ini = Ini::load_from_str(&content).map_err(|e| ConfigError::ProfileSyntax {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let section = ini
        .section(Some(branch))
        .ok_or_else(|| ConfigError::ConfigNotFound {
            branch: branch.to_string(),
            path: path.to_path_buf(),
        })?;

    let mut values = BTreeMap::new();
    if let Some(defaults) = ini.section(Some(DEFAULT_SECTION)) {
        for (k, v) in defaults.iter() {
            values.insert(k.to_ascii_lowercase(), v.trim().to_string());
        }
    }
    for (k, v) in section.iter() {
        values.insert(k.to_ascii_lowercase(), v.trim().to_string());
    }

    debug!(path = %path.display(), branch, keys = values.len(), "Loaded profile section");
    Ok(values)
}

/// Resolve the configuration for one region.
///
/// Injects `deployment_region` and `primary_region`, overriding any value
/// a profile might carry for them.
pub fn resolve(
    branch: &str,
    region: &str,
    primary_region: &str,
    path: &Path,
) -> Result<ConfigurationContext, ConfigError> {
    let mut values = load_section(path, branch)?;
    values.insert(keys::DEPLOYMENT_REGION.to_string(), region.to_string());
    values.insert(keys::PRIMARY_REGION.to_string(), primary_region.to_string());
    ConfigurationContext::from_values(branch, values)
}

/// Resolve every region in order, failing on the first error
pub fn resolve_all(
    branch: &str,
    profiles: &RegionProfiles,
) -> Result<Vec<ConfigurationContext>, ConfigError> {
    let primary = profiles.primary();
    profiles
        .iter()
        .map(|(region, path)| resolve(branch, region, primary, path))
        .collect()
}
