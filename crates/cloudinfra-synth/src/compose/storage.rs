//! Canary artifact bucket
//!
//! The noncurrent-version lifecycle rule bounds artifact growth and is not
//! configurable.

use crate::config::ConfigurationContext;
use crate::manifest::policy::{Effect, Principal};
use crate::manifest::resource::{
    BucketEncryption, BucketPolicyProps, BucketProps, EncryptionByDefault, EncryptionRule,
    LifecycleConfiguration, LifecycleRule, NoncurrentVersionExpiration, OwnershipControls,
    OwnershipRule, PublicAccessBlock, VersioningConfiguration,
};
use crate::manifest::{DeletionPolicy, PolicyDocument, PolicyStatement, Properties, Resource};
use crate::naming::NameComposer;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::{
    NONCURRENT_VERSION_EXPIRATION_DAYS, NONCURRENT_VERSIONS_TO_RETAIN,
};
use serde_json::json;

/// Minimum TLS version accepted by the bucket policy
pub const MIN_TLS_VERSION: f64 = 1.2;

pub fn bucket_arn(bucket_name: &str) -> String {
    format!("arn:aws:s3:::{bucket_name}")
}

/// Versioned, SSE-S3 encrypted, fully private bucket; retained on delete
pub fn artifact_bucket(ctx: &ConfigurationContext) -> Resource {
    let names = NameComposer::new(ctx);
    Resource::new(
        ResourceKind::Bucket,
        names.logical(ResourceKind::Bucket, &[]),
        Properties::Bucket(BucketProps {
            bucket_name: names.bucket(),
            versioning_configuration: VersioningConfiguration {
                status: "Enabled".to_string(),
            },
            bucket_encryption: BucketEncryption {
                server_side_encryption_configuration: vec![EncryptionRule {
                    server_side_encryption_by_default: EncryptionByDefault {
                        sse_algorithm: "AES256".to_string(),
                    },
                }],
            },
            public_access_block_configuration: PublicAccessBlock::block_all(),
            ownership_controls: OwnershipControls {
                rules: vec![OwnershipRule {
                    object_ownership: "BucketOwnerEnforced".to_string(),
                }],
            },
            lifecycle_configuration: LifecycleConfiguration {
                rules: vec![LifecycleRule {
                    id: names.bucket_lifecycle_rule(),
                    status: "Enabled".to_string(),
                    noncurrent_version_expiration: NoncurrentVersionExpiration {
                        noncurrent_days: NONCURRENT_VERSION_EXPIRATION_DAYS,
                        newer_noncurrent_versions: NONCURRENT_VERSIONS_TO_RETAIN,
                    },
                }],
            },
            tags: Vec::new(),
        }),
    )
    .with_deletion_policy(DeletionPolicy::Retain)
}

/// Deny any request without TLS, or with TLS older than 1.2
pub fn bucket_policy(ctx: &ConfigurationContext, bucket: &Resource) -> Resource {
    let names = NameComposer::new(ctx);
    let bucket_name = bucket.physical_name().unwrap_or_default();
    let resources = vec![
        bucket_arn(bucket_name),
        format!("{}/*", bucket_arn(bucket_name)),
    ];
    let deny = |sid: &str, condition: serde_json::Value| PolicyStatement {
        sid: Some(sid.to_string()),
        effect: Effect::Deny,
        principal: Some(Principal::Aws("*".to_string())),
        action: vec!["s3:*".to_string()],
        resource: resources.clone(),
        condition: Some(condition),
    };

    Resource::new(
        ResourceKind::BucketPolicy,
        names.logical(ResourceKind::BucketPolicy, &[]),
        Properties::BucketPolicy(BucketPolicyProps {
            bucket: bucket.handle(),
            policy_document: PolicyDocument::new(vec![
                deny(
                    "DenyInsecureTransport",
                    json!({"Bool": {"aws:SecureTransport": "false"}}),
                ),
                deny(
                    "DenyOutdatedTls",
                    json!({"NumericLessThan": {"s3:TlsVersion": MIN_TLS_VERSION}}),
                ),
            ]),
        }),
    )
}
