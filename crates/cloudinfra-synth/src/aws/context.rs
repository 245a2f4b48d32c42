//! Per-region AWS clients
//!
//! Synthesis reads two things from an account: the caller identity (STS)
//! and the region's network (EC2). Both clients are built once per region
//! from the same loaded SDK config.

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// EC2 and STS clients bound to one deployment region
#[derive(Clone)]
pub struct AwsContext {
    region: String,
    ec2: aws_sdk_ec2::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsContext {
    /// Load credentials from the default provider chain for `region`
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_config(region, &config)
    }

    /// Build the clients from an already loaded config
    pub fn from_config(region: &str, config: &SdkConfig) -> Self {
        Self {
            region: region.to_string(),
            ec2: aws_sdk_ec2::Client::new(config),
            sts: aws_sdk_sts::Client::new(config),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Client for VPC and prefix-list lookups
    pub fn ec2(&self) -> &aws_sdk_ec2::Client {
        &self.ec2
    }

    /// Client for the caller-identity check
    pub fn sts(&self) -> &aws_sdk_sts::Client {
        &self.sts
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires AWS credentials"]
    async fn test_clients_share_region() {
        let aws = AwsContext::new("eu-central-1").await;
        assert_eq!(aws.region(), "eu-central-1");
        assert_eq!(
            aws.ec2().config().region().map(|r| r.as_ref()),
            Some("eu-central-1")
        );
        assert_eq!(
            aws.sts().config().region().map(|r| r.as_ref()),
            Some("eu-central-1")
        );
    }
}
