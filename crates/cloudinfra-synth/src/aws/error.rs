//! AWS lookup errors
//!
//! Classifies SDK failures by their error code so callers can tell a
//! missing resource from throttling or a credentials problem.

use thiserror::Error;

/// AWS error categories for lookups
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found
    #[error("Resource not found: {resource_type} '{resource_id}'")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Credentials belong to a different account than the profile names
    #[error("credentials are for account {actual}, profile expects {expected}")]
    AccountMismatch { expected: String, actual: String },

    /// Offline run needed a lookup the cache does not hold
    #[error("no cached lookup for '{key}' and live lookups are disabled")]
    NotCached { key: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            AwsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            AwsError::NotCached { .. } => {
                Some("Run once without --offline to populate the lookup cache".to_string())
            }
            AwsError::AccountMismatch { .. } => {
                Some("Select credentials for the profile's workload_account".to_string())
            }
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[(&str, &str)] = &[
    ("InvalidVpcID.NotFound", "vpc"),
    ("InvalidPrefixListID.NotFound", "prefix list"),
    ("InvalidPrefixListId.NotFound", "prefix list"),
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "RequestLimitExceeded", "ThrottlingException"];

const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "UnauthorizedOperation",
        "The credentials lack ec2:DescribeVpcs or ec2:DescribeManagedPrefixLists",
    ),
    (
        "AuthFailure",
        "Credentials are invalid or expired; refresh them and retry",
    ),
    (
        "ExpiredToken",
        "Credentials are invalid or expired; refresh them and retry",
    ),
];

/// Classify an AWS error by its code
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) => {
            if let Some((_, resource_type)) = NOT_FOUND_CODES.iter().find(|(k, _)| *k == c) {
                AwsError::NotFound {
                    resource_type,
                    resource_id: message,
                }
            } else if THROTTLING_CODES.contains(&c) {
                AwsError::Throttled
            } else {
                AwsError::Sdk {
                    code: Some(c.to_string()),
                    message,
                }
            }
        }
        None => AwsError::Sdk {
            code: None,
            message,
        },
    }
}

fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
