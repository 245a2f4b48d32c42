//! AWS account identity
//!
//! Profiles name the workload account explicitly; live lookups refuse to run
//! with credentials for any other account.

use super::context::AwsContext;
use super::error::AwsError;
use anyhow::{Context, Result};
use tracing::info;

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(String);

impl AccountId {
    /// Create an AccountId for testing purposes
    #[cfg(test)]
    pub fn new(s: String) -> Self {
        AccountId(s)
    }

    /// Fail unless this is the `expected` account
    pub fn ensure(&self, expected: &str) -> Result<(), AwsError> {
        if self.0 == expected {
            Ok(())
        } else {
            Err(AwsError::AccountMismatch {
                expected: expected.to_string(),
                actual: self.0.clone(),
            })
        }
    }
}

/// Fetch the current AWS account ID via STS GetCallerIdentity
///
/// Needs no permissions beyond valid credentials.
pub async fn get_current_account_id(aws: &AwsContext) -> Result<AccountId> {
    let identity = aws
        .sts()
        .get_caller_identity()
        .send()
        .await
        .context("Failed to get AWS caller identity - check credentials")?;

    let account = identity
        .account()
        .context("No account ID returned from STS GetCallerIdentity")?;

    info!(account_id = %account, region = aws.region(), "AWS account validated");

    Ok(AccountId(account.to_string()))
}

/// Confirm the active credentials belong to `expected`
pub async fn verify_account(aws: &AwsContext, expected: &str) -> Result<AccountId> {
    let account = get_current_account_id(aws).await?;
    account.ensure(expected)?;
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_account() {
        let account = AccountId::new("123456789012".to_string());
        assert!(account.ensure("123456789012").is_ok());

        let err = account.ensure("210987654321").unwrap_err();
        assert!(matches!(err, AwsError::AccountMismatch { .. }));
        assert_eq!(account.len(), 12);
        assert_eq!(account.to_string(), "123456789012");
    }

    #[tokio::test]
    #[ignore = "requires AWS credentials"]
    async fn test_get_current_account_id() {
        let aws = AwsContext::new("eu-central-1").await;
        let account = get_current_account_id(&aws).await.unwrap();
        assert_eq!(account.len(), 12);
    }
}
