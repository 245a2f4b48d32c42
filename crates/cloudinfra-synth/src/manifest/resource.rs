//! Resource declarations
//!
//! One [`Properties`] variant per resource family. Property structs
//! serialize with CloudFormation's PascalCase field names, so a rendered
//! resource is exactly what the deployment engine consumes.

use super::handle::Handle;
use super::policy::PolicyDocument;
use cloudinfra_common::ResourceKind;
use indexmap::IndexMap;
use serde::Serialize;

/// What happens to the physical resource when it leaves the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum DeletionPolicy {
    Delete,
    Retain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// Security group

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EgressRule {
    pub ip_protocol: String,
    pub from_port: u16,
    pub to_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_prefix_list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupProps {
    pub group_name: String,
    pub group_description: String,
    pub vpc_id: String,
    pub security_group_egress: Vec<EgressRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// Bucket

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersioningConfiguration {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionByDefault {
    #[serde(rename = "SSEAlgorithm")]
    pub sse_algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionRule {
    pub server_side_encryption_by_default: EncryptionByDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketEncryption {
    pub server_side_encryption_configuration: Vec<EncryptionRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn block_all() -> Self {
        Self {
            block_public_acls: true,
            block_public_policy: true,
            ignore_public_acls: true,
            restrict_public_buckets: true,
        }
    }

    pub fn is_block_all(&self) -> bool {
        self.block_public_acls
            && self.block_public_policy
            && self.ignore_public_acls
            && self.restrict_public_buckets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnershipRule {
    pub object_ownership: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnershipControls {
    pub rules: Vec<OwnershipRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionExpiration {
    pub noncurrent_days: u32,
    pub newer_noncurrent_versions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRule {
    pub id: String,
    pub status: String,
    pub noncurrent_version_expiration: NoncurrentVersionExpiration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleConfiguration {
    pub rules: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketProps {
    pub bucket_name: String,
    pub versioning_configuration: VersioningConfiguration,
    pub bucket_encryption: BucketEncryption,
    pub public_access_block_configuration: PublicAccessBlock,
    pub ownership_controls: OwnershipControls,
    pub lifecycle_configuration: LifecycleConfiguration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicyProps {
    pub bucket: Handle,
    pub policy_document: PolicyDocument,
}

// IAM

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlinePolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProps {
    pub role_name: String,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<String>,
    pub policies: Vec<InlinePolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// Logs

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroupProps {
    pub log_group_name: String,
    pub retention_in_days: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// Synthetics

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CanaryCode {
    pub handler: String,
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunConfig {
    pub active_tracing: bool,
    pub environment_variables: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Schedule {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfig {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<Handle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CanaryProps {
    pub name: String,
    pub runtime_version: String,
    pub artifact_s3_location: String,
    pub execution_role_arn: Handle,
    pub code: CanaryCode,
    pub run_config: RunConfig,
    pub schedule: Schedule,
    #[serde(rename = "VPCConfig")]
    pub vpc_config: VpcConfig,
    pub success_retention_period: u32,
    pub failure_retention_period: u32,
    pub start_canary_after_creation: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// Fault injection

/// How many of the resolved targets an experiment acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SelectionMode {
    #[display("ALL")]
    All,
    #[display("PERCENT({_0})")]
    Percent(u8),
}

impl Serialize for SelectionMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentTarget {
    pub resource_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_arns: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub resource_tags: IndexMap<String, String>,
    pub selection_mode: SelectionMode,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
}

impl ExperimentTarget {
    pub fn new(resource_type: &str, selection_mode: SelectionMode) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            resource_arns: Vec::new(),
            resource_tags: IndexMap::new(),
            selection_mode,
            parameters: IndexMap::new(),
        }
    }

    pub fn arns(mut self, arns: impl IntoIterator<Item = String>) -> Self {
        self.resource_arns.extend(arns);
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.resource_tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentAction {
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
    /// Action target slot → target key in the template's `Targets`
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub targets: IndexMap<String, String>,
}

impl ExperimentAction {
    pub fn new(action_id: &str) -> Self {
        Self {
            action_id: action_id.to_string(),
            description: None,
            parameters: IndexMap::new(),
            targets: IndexMap::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn target(mut self, slot: &str, target_key: &str) -> Self {
        self.targets.insert(slot.to_string(), target_key.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StopCondition {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentOptions {
    pub account_targeting: String,
    pub empty_target_resolution_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudWatchLogsConfiguration {
    pub log_group_arn: Handle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogConfiguration {
    pub cloud_watch_logs_configuration: CloudWatchLogsConfiguration,
    pub log_schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExperimentTemplateProps {
    pub description: String,
    pub role_arn: Handle,
    pub targets: IndexMap<String, ExperimentTarget>,
    pub actions: IndexMap<String, ExperimentAction>,
    pub stop_conditions: Vec<StopCondition>,
    pub experiment_options: ExperimentOptions,
    pub log_configuration: LogConfiguration,
    pub tags: IndexMap<String, String>,
}

/// Closed set of resource property shapes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Properties {
    SecurityGroup(SecurityGroupProps),
    Bucket(BucketProps),
    BucketPolicy(BucketPolicyProps),
    Role(RoleProps),
    LogGroup(LogGroupProps),
    Canary(CanaryProps),
    ExperimentTemplate(ExperimentTemplateProps),
}

impl Properties {
    /// Whether these properties describe a resource of `kind`
    pub fn matches(&self, kind: ResourceKind) -> bool {
        matches!(
            (self, kind),
            (Properties::SecurityGroup(_), ResourceKind::SecurityGroup)
                | (Properties::Bucket(_), ResourceKind::Bucket)
                | (Properties::BucketPolicy(_), ResourceKind::BucketPolicy)
                | (
                    Properties::Role(_),
                    ResourceKind::CanaryRole | ResourceKind::FisRole
                )
                | (Properties::LogGroup(_), ResourceKind::LogGroup)
                | (Properties::Canary(_), ResourceKind::Canary)
                | (
                    Properties::ExperimentTemplate(_),
                    ResourceKind::ExperimentTemplate
                )
        )
    }

    /// Provider-visible name, for kinds that have one
    pub fn physical_name(&self) -> Option<&str> {
        match self {
            Properties::SecurityGroup(p) => Some(&p.group_name),
            Properties::Bucket(p) => Some(&p.bucket_name),
            Properties::Role(p) => Some(&p.role_name),
            Properties::LogGroup(p) => Some(&p.log_group_name),
            Properties::Canary(p) => Some(&p.name),
            Properties::BucketPolicy(_) | Properties::ExperimentTemplate(_) => None,
        }
    }

    /// Handles embedded in the properties
    pub fn handles(&self) -> Vec<&Handle> {
        match self {
            Properties::BucketPolicy(p) => vec![&p.bucket],
            Properties::Canary(p) => std::iter::once(&p.execution_role_arn)
                .chain(p.vpc_config.security_group_ids.iter())
                .collect(),
            Properties::ExperimentTemplate(p) => vec![
                &p.role_arn,
                &p.log_configuration.cloud_watch_logs_configuration.log_group_arn,
            ],
            Properties::SecurityGroup(_)
            | Properties::Bucket(_)
            | Properties::Role(_)
            | Properties::LogGroup(_) => Vec::new(),
        }
    }

    /// Merge stack tags in; keys the resource already sets are kept
    pub(crate) fn apply_tags(&mut self, tags: &IndexMap<String, String>) {
        let list = match self {
            Properties::SecurityGroup(p) => &mut p.tags,
            Properties::Bucket(p) => &mut p.tags,
            Properties::Role(p) => &mut p.tags,
            Properties::LogGroup(p) => &mut p.tags,
            Properties::Canary(p) => &mut p.tags,
            Properties::ExperimentTemplate(p) => {
                for (key, value) in tags {
                    p.tags.entry(key.clone()).or_insert_with(|| value.clone());
                }
                return;
            }
            // Bucket policies are not taggable
            Properties::BucketPolicy(_) => return,
        };
        for (key, value) in tags {
            if !list.iter().any(|t| &t.key == key) {
                list.push(Tag::new(key.clone(), value.clone()));
            }
        }
    }
}

/// One declared resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    kind: ResourceKind,
    name: String,
    logical_id: String,
    properties: Properties,
    deletion_policy: Option<DeletionPolicy>,
    depends_on: Vec<String>,
}

impl Resource {
    /// Declare a resource whose identity is the composed `name`
    pub fn new(kind: ResourceKind, name: impl Into<String>, properties: Properties) -> Self {
        debug_assert!(properties.matches(kind), "{kind} with mismatched properties");
        let name = name.into();
        Self {
            kind,
            logical_id: logical_id(&name),
            name,
            properties,
            deletion_policy: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Add an explicit ordering edge to another resource in the same stack
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Composed identity name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn physical_name(&self) -> Option<&str> {
        self.properties.physical_name()
    }

    pub fn deletion_policy(&self) -> Option<DeletionPolicy> {
        self.deletion_policy
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// `Ref` to this resource
    pub fn handle(&self) -> Handle {
        Handle::Ref(self.logical_id.clone())
    }

    /// `Fn::GetAtt` on this resource
    pub fn attr(&self, attribute: &'static str) -> Handle {
        Handle::get_att(self.logical_id.clone(), attribute)
    }

    pub(crate) fn apply_tags(&mut self, tags: &IndexMap<String, String>) {
        self.properties.apply_tags(tags);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RenderedResource<'a> {
    #[serde(rename = "Type")]
    resource_type: &'static str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    depends_on: &'a [String],
    properties: &'a Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletion_policy: Option<DeletionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_replace_policy: Option<DeletionPolicy>,
}

impl Serialize for Resource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RenderedResource {
            resource_type: self.kind.cfn_type(),
            depends_on: &self.depends_on,
            properties: &self.properties,
            deletion_policy: self.deletion_policy,
            update_replace_policy: self.deletion_policy,
        }
        .serialize(serializer)
    }
}

/// Template logical id for a composed name.
///
/// Logical ids are alphanumeric; each `-`-separated segment is capitalized
/// so segment boundaries stay visible.
pub fn logical_id(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
