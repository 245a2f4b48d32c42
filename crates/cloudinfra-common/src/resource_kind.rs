//! Resource kinds and their topology scope
//!
//! The catalog is closed: every resource the synthesizer can emit is one of
//! these kinds. Each kind knows whether it is account-global (created only in
//! the primary region) or regional, and which token it contributes to
//! composed names.

/// Whether a resource exists once per account or once per region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RegionScope {
    /// Created only in the primary region
    Global,
    /// Created in every region
    Regional,
}

/// Types of resources emitted by cloudinfra
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
    serde::Serialize,
)]
pub enum ResourceKind {
    /// Egress-only security group for canaries
    SecurityGroup,
    /// Canary artifact bucket
    Bucket,
    /// TLS-enforcing policy attached to the artifact bucket
    BucketPolicy,
    /// Canary execution role
    CanaryRole,
    /// Fault injection execution role
    FisRole,
    /// Experiment log group
    LogGroup,
    /// Synthetic HTTP canary
    Canary,
    /// Fault injection experiment template
    ExperimentTemplate,
}

impl ResourceKind {
    /// Region scope of this kind
    ///
    /// IAM entities are account-scoped. Experiment templates are kept with
    /// the role they run under so the catalog exists exactly once.
    pub fn scope(self) -> RegionScope {
        match self {
            ResourceKind::CanaryRole
            | ResourceKind::FisRole
            | ResourceKind::ExperimentTemplate => RegionScope::Global,
            ResourceKind::SecurityGroup
            | ResourceKind::Bucket
            | ResourceKind::BucketPolicy
            | ResourceKind::LogGroup
            | ResourceKind::Canary => RegionScope::Regional,
        }
    }

    /// Token inserted into composed names after the application name
    pub fn name_token(self) -> &'static str {
        match self {
            ResourceKind::SecurityGroup => "canary-sg",
            ResourceKind::Bucket => "canary-s3",
            ResourceKind::BucketPolicy => "canary-s3-policy",
            ResourceKind::CanaryRole => "canary-role",
            ResourceKind::FisRole => "exec-role",
            ResourceKind::LogGroup => "fis-logs",
            ResourceKind::Canary => "canary",
            ResourceKind::ExperimentTemplate => "experiment",
        }
    }

    /// CloudFormation resource type
    pub fn cfn_type(self) -> &'static str {
        match self {
            ResourceKind::SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceKind::Bucket => "AWS::S3::Bucket",
            ResourceKind::BucketPolicy => "AWS::S3::BucketPolicy",
            ResourceKind::CanaryRole | ResourceKind::FisRole => "AWS::IAM::Role",
            ResourceKind::LogGroup => "AWS::Logs::LogGroup",
            ResourceKind::Canary => "AWS::Synthetics::Canary",
            ResourceKind::ExperimentTemplate => "AWS::FIS::ExperimentTemplate",
        }
    }

    /// Whether the physical name lives in an account- or world-wide namespace
    /// and must therefore be unique across every synthesized stack
    pub fn has_global_physical_name(self) -> bool {
        matches!(
            self,
            ResourceKind::Bucket | ResourceKind::CanaryRole | ResourceKind::FisRole
        )
    }
}
