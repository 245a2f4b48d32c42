//! Deterministic resource naming
//!
//! Every name is composed from the same ordered tuple of profile fields:
//!
//! ```text
//! {resource_prefix}-{service_name}-{app_env}-{app_name}-{segments...}-{resource_suffix}
//! ```
//!
//! The deployment engine treats these strings as stable identities, so the
//! field order must never change. Physical names that live in a global
//! namespace (S3 buckets) additionally carry the account and region.

use crate::config::ConfigurationContext;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::FIS_LOG_GROUP_PREFIX;

/// S3 bucket names are limited to 63 characters
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// IAM role names are limited to 64 characters
pub const MAX_ROLE_NAME_LEN: usize = 64;

/// Upper bound for every other composed name
pub const MAX_NAME_LEN: usize = 255;

/// Composes names for one configuration context
#[derive(Debug, Clone, Copy)]
pub struct NameComposer<'a> {
    ctx: &'a ConfigurationContext,
}

impl<'a> NameComposer<'a> {
    pub fn new(ctx: &'a ConfigurationContext) -> Self {
        Self { ctx }
    }

    /// `{prefix}-{service}-{env}-{app}`
    pub fn base(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.ctx.resource_prefix, self.ctx.service_name, self.ctx.app_env, self.ctx.app_name
        )
    }

    /// Base, then each segment, then the suffix, joined by `-`
    pub fn compose<S: AsRef<str>>(&self, segments: &[S]) -> String {
        let mut name = self.base();
        for segment in segments {
            name.push('-');
            name.push_str(segment.as_ref());
        }
        name.push('-');
        name.push_str(&self.ctx.resource_suffix);
        name
    }

    /// Logical name for a kind with optional distinguishing parts
    pub fn logical(&self, kind: ResourceKind, parts: &[&str]) -> String {
        let mut segments = Vec::with_capacity(parts.len() + 1);
        segments.push(kind.name_token());
        segments.extend_from_slice(parts);
        self.compose(&segments)
    }

    /// Stack name for the context's deployment region
    pub fn stack(&self) -> String {
        self.compose(&["infra-stack", self.ctx.deployment_region.as_str()])
    }

    /// Artifact bucket name, unique per account and region
    pub fn bucket(&self) -> String {
        self.compose(&[
            ResourceKind::Bucket.name_token(),
            self.ctx.workload_account.as_str(),
            self.ctx.deployment_region.as_str(),
        ])
        .to_ascii_lowercase()
    }

    /// Lifecycle rule id on the artifact bucket
    pub fn bucket_lifecycle_rule(&self) -> String {
        self.compose(&["s3-lifecycle"])
    }

    /// Role name for an IAM role kind
    pub fn role(&self, kind: ResourceKind) -> String {
        self.logical(kind, &[])
    }

    /// ARN of a role in the workload account
    pub fn role_arn(&self, kind: ResourceKind) -> String {
        format!(
            "arn:aws:iam::{}:role/{}",
            self.ctx.workload_account,
            self.role(kind)
        )
    }

    /// Experiment log group name
    pub fn log_group(&self) -> String {
        format!(
            "{FIS_LOG_GROUP_PREFIX}{}",
            self.logical(ResourceKind::LogGroup, &[])
        )
    }

    /// Canary name for one canary label.
    ///
    /// Synthetics only accepts lower-case canary names.
    pub fn canary(&self, label: &str) -> String {
        self.logical(ResourceKind::Canary, &[label]).to_ascii_lowercase()
    }

    /// Name of a database cluster owned by this service
    pub fn db_cluster(&self, db_name: &str) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.ctx.resource_prefix,
            self.ctx.service_name,
            self.ctx.app_env,
            db_name,
            self.ctx.resource_suffix
        )
    }

    /// Name of an ECS service owned by this service
    pub fn ecs_service(&self, service: &str) -> String {
        self.db_cluster(service)
    }
}

/// Check a composed name against the provider's rules for its kind
pub fn validate_name(kind: ResourceKind, name: &str) -> Result<(), String> {
    let (max_len, lowercase_only) = match kind {
        ResourceKind::Bucket => (MAX_BUCKET_NAME_LEN, true),
        ResourceKind::Canary => (MAX_NAME_LEN, true),
        ResourceKind::CanaryRole | ResourceKind::FisRole => (MAX_ROLE_NAME_LEN, false),
        _ => (MAX_NAME_LEN, false),
    };
    let body = match kind {
        ResourceKind::LogGroup => name.strip_prefix(FIS_LOG_GROUP_PREFIX).unwrap_or(name),
        _ => name,
    };
    check(name, body, max_len, lowercase_only)
}

/// Check a composed identity (logical) name, independent of its kind
pub fn validate_identity(name: &str) -> Result<(), String> {
    check(name, name, MAX_NAME_LEN, false)
}

fn check(name: &str, body: &str, max_len: usize, lowercase_only: bool) -> Result<(), String> {
    if body.is_empty() {
        return Err("name is empty".to_string());
    }
    if name.len() > max_len {
        return Err(format!("{} characters exceeds limit of {max_len}", name.len()));
    }
    if body.starts_with('-') || body.ends_with('-') {
        return Err("name may not start or end with '-'".to_string());
    }
    if let Some(bad) = body
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Err(format!("illegal character {bad:?}"));
    }
    if lowercase_only && body.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("name must be lower-case".to_string());
    }
    Ok(())
}
