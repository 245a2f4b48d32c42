//! Centralized test fixtures for unit tests.
//!
//! Integration tests use `cloudinfra-test-utils`, which carries the same
//! profile text without depending on this crate.

#[cfg(test)]
pub mod fixtures {
    use crate::aws::ec2::{NetworkInfo, PrefixListInfo, VpcInfo};
    use crate::config::{ApplicationDescriptor, ConfigurationContext};
    use std::collections::BTreeMap;

    /// Application list with one application probing two URLs
    pub const SAMPLE_APPS_JSON: &str = r#"[
        {
            "names": ["orders", "users"],
            "urls": ["https://orders.example.com/health", "https://users.example.com/health"],
            "subnet_id": "subnet-0c1",
            "canary_name": "web"
        }
    ]"#;

    /// Profile text with a single branch section
    pub fn sample_profile(branch: &str) -> String {
        let mut out = format!("[{branch}]\n");
        for (k, v) in sample_values("", "") {
            if k != "deployment_region" && k != "primary_region" {
                out.push_str(&format!("{k} = {v}\n"));
            }
        }
        out
    }

    /// Complete key/value map for one region
    pub fn sample_values(region: &str, primary: &str) -> BTreeMap<String, String> {
        [
            ("resource_prefix", "sw"),
            ("service_name", "resil"),
            ("app_env", "dev"),
            ("app_name", "mra"),
            ("resource_suffix", "01"),
            ("workload_account", "123456789012"),
            ("asset_prefix", "cdk-assets"),
            ("cost_center", "cc-1234"),
            ("vpc_id", "vpc-0abc123"),
            ("subnet_az1_list", "subnet-0a1,subnet-0a2"),
            ("subnet_az2_list", "subnet-0b1"),
            ("az1_name", "euc1-az1"),
            ("az2_name", "euc1-az2"),
            ("s3_prefix_list", "pl-6ea54007"),
            ("db_clusters", "orders-db,users-db"),
            ("ecs_services", "svc-a,svc-b"),
            ("ecs_taks_percents", "25,50"),
            ("deployment_region", region),
            ("primary_region", primary),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Resolved context for `region` with `eu-central-1` as primary
    pub fn sample_context(region: &str) -> ConfigurationContext {
        ConfigurationContext::from_values("dev", sample_values(region, "eu-central-1"))
            .expect("sample values are valid")
    }

    /// Parsed sample application list
    pub fn sample_apps() -> Vec<ApplicationDescriptor> {
        serde_json::from_str(SAMPLE_APPS_JSON).expect("sample apps are valid")
    }

    /// Network lookup result matching the sample profile
    pub fn sample_network() -> NetworkInfo {
        NetworkInfo {
            vpc: VpcInfo {
                vpc_id: "vpc-0abc123".to_string(),
                cidr_block: "10.20.0.0/16".to_string(),
            },
            prefix_list: PrefixListInfo {
                prefix_list_id: "pl-6ea54007".to_string(),
                name: "com.amazonaws.eu-central-1.s3".to_string(),
            },
        }
    }
}
