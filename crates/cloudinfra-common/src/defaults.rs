//! Default configuration values and fixed resource settings
//!
//! These constants keep the synthesized resources consistent across regions
//! and branches.

/// Environment variable selecting the branch section of each region profile
pub const BRANCH_ENV_VAR: &str = "SRC_BRANCH";

/// Branch used when `SRC_BRANCH` is unset
pub const DEFAULT_BRANCH: &str = "dev";

/// Region profiles in deployment order. The first region is the primary.
pub const DEFAULT_REGION_PROFILES: &[(&str, &str)] = &[
    ("eu-central-1", "resource.eu-central-1.config"),
    ("us-east-1", "resource.us-east-1.config"),
];

/// Default product identifier used for `sw:application` and `sw:product`
pub const DEFAULT_PRODUCT: &str = "mra";

/// Default output directory for synthesized templates
pub const DEFAULT_OUT_DIR: &str = "synth.out";

/// Default lookup cache file
pub const DEFAULT_LOOKUP_CACHE: &str = "cloudinfra.context.json";

/// Application list path for a branch
pub fn app_list_path(branch: &str) -> String {
    format!("config/canary_app_list_{branch}.json")
}

// Artifact store lifecycle

/// Days after which noncurrent artifact versions expire
pub const NONCURRENT_VERSION_EXPIRATION_DAYS: u32 = 7;

/// Number of noncurrent artifact versions to retain
pub const NONCURRENT_VERSIONS_TO_RETAIN: u32 = 1;

// Canary settings

/// Synthetics runtime for the HTTP probe script
pub const CANARY_RUNTIME_VERSION: &str = "syn-python-selenium-5.0";

/// Canary handler entry point
pub const CANARY_HANDLER: &str = "index.handler";

/// Canary schedule expression
pub const CANARY_SCHEDULE: &str = "rate(1 minute)";

/// Days to keep successful run artifacts
pub const CANARY_SUCCESS_RETENTION_DAYS: u32 = 30;

/// Days to keep failed run artifacts
pub const CANARY_FAILURE_RETENTION_DAYS: u32 = 30;

/// Environment variable carrying the probed URL into the canary
pub const CANARY_TARGET_URL_VAR: &str = "TARGET_URL";

// Fault injection settings

/// Log group path prefix for experiment logs
pub const FIS_LOG_GROUP_PREFIX: &str = "/sw/fis/";

/// Experiment log retention in days
pub const FIS_LOG_RETENTION_DAYS: u32 = 30;

/// Duration of disruptive experiment actions (ISO 8601)
pub const FIS_ACTION_DURATION: &str = "PT15M";

/// Experiment log schema version
pub const FIS_LOG_SCHEMA_VERSION: u32 = 2;

/// HTTPS port allowed for canary egress
pub const HTTPS_PORT: u16 = 443;
