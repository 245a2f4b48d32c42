//! AWS lookups
//!
//! Synthesis reads very little from the account:
//! - STS: caller account, checked against the profile's workload account
//! - EC2: VPC CIDR block and S3 managed prefix list
//!
//! Results are cached on disk so later runs can work offline.

pub mod account;
pub mod context;
pub mod ec2;
pub mod error;
pub mod lookup_cache;

pub use account::{AccountId, get_current_account_id, verify_account};
pub use context::AwsContext;
pub use ec2::{Ec2Client, NetworkInfo, NetworkLookup, PrefixListInfo, VpcInfo, resolve_network};
pub use error::{AwsError, classify_aws_error};
pub use lookup_cache::LookupCache;

#[cfg(test)]
pub use ec2::MockNetworkLookup;
