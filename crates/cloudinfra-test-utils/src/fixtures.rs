//! On-disk fixtures
//!
//! [`FixtureTree`] writes a complete configuration tree (two region
//! profiles, an application list and a populated lookup cache) into a
//! temporary directory, so integration tests can run fully offline.

use chrono::{TimeZone, Utc};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Workload account used by every fixture profile
pub const TEST_ACCOUNT: &str = "123456789012";

/// Regions of the fixture tree, primary first
pub const TEST_REGIONS: [&str; 2] = ["eu-central-1", "us-east-1"];

pub const TEST_VPC_ID: &str = "vpc-0abc123";
pub const TEST_VPC_CIDR: &str = "10.20.0.0/16";
pub const TEST_PREFIX_LIST_ID: &str = "pl-6ea54007";

/// One application probing two URLs from one subnet
pub const APPS_JSON: &str = r#"[
    {
        "app_names": ["orders", "users"],
        "app_urls": ["https://orders.example.com/health", "https://users.example.com/health"],
        "subnet_id": "subnet-0c1",
        "canary_name": "web"
    }
]"#;

/// Profile lines for one branch section, without the header
pub fn profile_body(region: &str) -> String {
    let az = match region {
        "us-east-1" => "use1",
        _ => "euc1",
    };
    format!(
        "resource_prefix = sw
service_name = resil
app_env = dev
app_name = mra
resource_suffix = 01
workload_account = {TEST_ACCOUNT}
asset_prefix = cdk-assets
cost_center = cc-1234
vpc_id = {TEST_VPC_ID}
subnet_az1_list = subnet-0a1,subnet-0a2
subnet_az2_list = subnet-0b1
az1_name = {az}-az1
az2_name = {az}-az2
s3_prefix_list = {TEST_PREFIX_LIST_ID}
db_clusters = orders-db,users-db
ecs_services = svc-a,svc-b
ecs_taks_percents = 25,50
"
    )
}

/// Region profile with a single `[branch]` section
pub fn profile(branch: &str, region: &str) -> String {
    format!("[{branch}]\n{}", profile_body(region))
}

/// Lookup cache document covering the fixture VPC and prefix list in
/// every region of [`TEST_REGIONS`]
pub fn lookup_cache_json() -> serde_json::Value {
    let looked_up_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    let mut entries = serde_json::Map::new();
    for region in TEST_REGIONS {
        entries.insert(
            format!("vpc:{TEST_ACCOUNT}:{region}:{TEST_VPC_ID}"),
            json!({
                "looked_up_at": looked_up_at,
                "value": {"type": "vpc", "vpc_id": TEST_VPC_ID, "cidr_block": TEST_VPC_CIDR},
            }),
        );
        entries.insert(
            format!("prefix-list:{TEST_ACCOUNT}:{region}:{TEST_PREFIX_LIST_ID}"),
            json!({
                "looked_up_at": looked_up_at,
                "value": {
                    "type": "prefix-list",
                    "prefix_list_id": TEST_PREFIX_LIST_ID,
                    "name": format!("com.amazonaws.{region}.s3"),
                },
            }),
        );
    }
    json!({ "entries": entries })
}

/// A temporary configuration tree
pub struct FixtureTree {
    dir: TempDir,
}

impl FixtureTree {
    /// Write profiles for `branch`, the application list and the lookup cache
    pub fn new(branch: &str) -> std::io::Result<Self> {
        let tree = Self {
            dir: TempDir::new()?,
        };
        for region in TEST_REGIONS {
            tree.write(&Self::profile_name(region), &profile(branch, region))?;
        }
        tree.write(&format!("config/canary_app_list_{branch}.json"), APPS_JSON)?;
        tree.write(
            "cloudinfra.context.json",
            &serde_json::to_string_pretty(&lookup_cache_json()).unwrap_or_default(),
        )?;
        Ok(tree)
    }

    fn profile_name(region: &str) -> String {
        format!("resource.{region}.config")
    }

    /// Write (or overwrite) a file relative to the tree root
    pub fn write(&self, relative: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Profile path for one of [`TEST_REGIONS`]
    pub fn profile_path(&self, region: &str) -> PathBuf {
        self.root().join(Self::profile_name(region))
    }

    /// `(region, profile path)` pairs in deployment order
    pub fn region_profiles(&self) -> Vec<(String, PathBuf)> {
        TEST_REGIONS
            .iter()
            .map(|r| (r.to_string(), self.profile_path(r)))
            .collect()
    }

    pub fn apps_path(&self, branch: &str) -> PathBuf {
        self.root()
            .join(format!("config/canary_app_list_{branch}.json"))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root().join("cloudinfra.context.json")
    }

    /// Fresh output directory inside the tree
    pub fn out_dir(&self) -> PathBuf {
        self.root().join("synth.out")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_tree_layout() {
        let tree = FixtureTree::new("dev").unwrap();
        assert!(tree.profile_path("eu-central-1").exists());
        assert!(tree.profile_path("us-east-1").exists());
        assert!(tree.apps_path("dev").exists());
        assert!(tree.cache_path().exists());

        let profile = std::fs::read_to_string(tree.profile_path("us-east-1")).unwrap();
        assert!(profile.starts_with("[dev]\n"));
        assert!(profile.contains("az1_name = use1-az1"));
    }

    #[test]
    fn test_cache_has_every_region() {
        let cache = lookup_cache_json();
        let entries = cache["entries"].as_object().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries["vpc:123456789012:us-east-1:vpc-0abc123"]["value"]["type"],
            "vpc"
        );
    }
}
