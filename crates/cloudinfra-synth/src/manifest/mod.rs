//! Synthesized output model
//!
//! A [`Stack`] collects the resources declared for one region and enforces
//! the composition invariants as each resource is added:
//!
//! - account-global kinds only in the primary region's stack
//! - every name valid for its kind
//! - no two resources sharing a name or logical id
//! - every handle pointing at an already-declared resource
//!
//! An [`Assembly`] holds every stack of a run, checks that globally-named
//! physical resources (buckets, roles) are unique across stacks, and renders
//! one template per stack plus `manifest.json`.

pub mod handle;
pub mod policy;
pub mod resource;

pub use handle::Handle;
pub use policy::{PolicyDocument, PolicyStatement};
pub use resource::{DeletionPolicy, Properties, Resource};

use crate::config::ConfigurationContext;
use crate::error::ComposeError;
use crate::naming::{NameComposer, validate_identity, validate_name};
use anyhow::{Context, Result};
use cloudinfra_common::tags::stack_tags;
use cloudinfra_common::{RegionScope, ResourceKind};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest file written next to the templates
pub const MANIFEST_FILE: &str = "manifest.json";

/// Manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// A named exemption for the post-synthesis compliance scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suppression {
    pub id: &'static str,
    pub reason: &'static str,
}

/// Exemptions attached to every stack
pub const DEFAULT_SUPPRESSIONS: &[Suppression] = &[
    Suppression {
        id: "AwsSolutions-S1",
        reason: "Cloudtrail already capturing access of S3 data plane",
    },
    Suppression {
        id: "AwsSolutions-IAM5",
        reason: "IAM policy with resource star",
    },
    Suppression {
        id: "AwsSolutions-IAM4",
        reason: "IAM managed policy",
    },
];

/// Resources declared for one region
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    region: String,
    primary_region: String,
    account: String,
    tags: IndexMap<String, String>,
    suppressions: Vec<Suppression>,
    resources: Vec<Resource>,
    names: HashSet<String>,
    physical_names: HashSet<(ResourceKind, String)>,
    logical_ids: HashSet<String>,
}

impl Stack {
    /// Empty stack for the context's deployment region
    pub fn new(ctx: &ConfigurationContext) -> Self {
        let tags = stack_tags(&ctx.product, &ctx.app_env, &ctx.cost_center)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            name: NameComposer::new(ctx).stack(),
            region: ctx.deployment_region.clone(),
            primary_region: ctx.primary_region.clone(),
            account: ctx.workload_account.clone(),
            tags,
            suppressions: DEFAULT_SUPPRESSIONS.to_vec(),
            resources: Vec::new(),
            names: HashSet::new(),
            physical_names: HashSet::new(),
            logical_ids: HashSet::new(),
        }
    }

    /// Declare a resource, enforcing every stack invariant
    pub fn add(&mut self, mut resource: Resource) -> Result<&Resource, ComposeError> {
        let kind = resource.kind();

        if kind.scope() == RegionScope::Global && self.region != self.primary_region {
            return Err(ComposeError::GlobalResourceOutsidePrimary {
                kind,
                region: self.region.clone(),
                primary: self.primary_region.clone(),
            });
        }

        validate_identity(resource.name()).map_err(|reason| ComposeError::InvalidName {
            kind,
            name: resource.name().to_string(),
            reason,
        })?;
        if let Some(physical) = resource.physical_name() {
            validate_name(kind, physical).map_err(|reason| ComposeError::InvalidName {
                kind,
                name: physical.to_string(),
                reason,
            })?;
        }

        let duplicate = |name: &str| ComposeError::DuplicateName {
            kind,
            name: name.to_string(),
            scope: self.name.clone(),
        };
        if self.names.contains(resource.name()) || self.logical_ids.contains(resource.logical_id())
        {
            return Err(duplicate(resource.name()));
        }
        if let Some(physical) = resource.physical_name()
            && self.physical_names.contains(&(kind, physical.to_string()))
        {
            return Err(duplicate(physical));
        }

        let targets = resource
            .properties()
            .handles()
            .into_iter()
            .filter_map(Handle::target)
            .chain(resource.dependencies().iter().map(String::as_str));
        for target in targets {
            if !self.logical_ids.contains(target) {
                return Err(ComposeError::MissingDependency {
                    name: resource.name().to_string(),
                    target: target.to_string(),
                });
            }
        }

        resource.apply_tags(&self.tags);
        self.names.insert(resource.name().to_string());
        self.logical_ids.insert(resource.logical_id().to_string());
        if let Some(physical) = resource.physical_name() {
            self.physical_names.insert((kind, physical.to_string()));
        }
        debug!(stack = %self.name, %kind, name = resource.name(), "Declared resource");

        let index = self.resources.len();
        self.resources.push(resource);
        Ok(&self.resources[index])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn is_primary(&self) -> bool {
        self.region == self.primary_region
    }

    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.tags
    }

    pub fn suppressions(&self) -> &[Suppression] {
        &self.suppressions
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Resources of one kind, in declaration order
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Template file name inside the output directory
    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.name)
    }

    /// Render the stack as a pretty-printed template with a trailing newline
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(&self.template())?;
        out.push('\n');
        Ok(out)
    }

    fn template(&self) -> Template<'_> {
        Template {
            format_version: "2010-09-09",
            description: format!("Canary and fault injection infrastructure ({})", self.name),
            metadata: TemplateMetadata {
                cdk_nag: NagMetadata {
                    rules_to_suppress: &self.suppressions,
                },
            },
            resources: self
                .resources
                .iter()
                .map(|r| (r.logical_id(), r))
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Template<'a> {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,
    description: String,
    metadata: TemplateMetadata<'a>,
    resources: IndexMap<&'a str, &'a Resource>,
}

#[derive(Serialize)]
struct TemplateMetadata<'a> {
    cdk_nag: NagMetadata<'a>,
}

#[derive(Serialize)]
struct NagMetadata<'a> {
    rules_to_suppress: &'a [Suppression],
}

/// One stack's entry in `manifest.json`
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub stack_name: String,
    pub region: String,
    pub account: String,
    pub primary: bool,
    pub template: String,
    pub resources: usize,
    pub tags: IndexMap<String, String>,
    /// Stacks that must be deployed first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub version: u32,
    pub branch: String,
    pub stacks: Vec<ManifestEntry>,
}

/// Every stack of one synthesis run
#[derive(Debug, Clone)]
pub struct Assembly {
    branch: String,
    stacks: Vec<Stack>,
    global_names: HashMap<String, String>,
}

impl Assembly {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            stacks: Vec::new(),
            global_names: HashMap::new(),
        }
    }

    /// Add a completed stack; globally-named resources must not repeat
    pub fn add_stack(&mut self, stack: Stack) -> Result<(), ComposeError> {
        if self.stacks.iter().any(|s| s.region == stack.region) {
            return Err(ComposeError::DuplicateStack(stack.name));
        }

        let mut claimed = Vec::new();
        for resource in stack.resources() {
            if !resource.kind().has_global_physical_name() {
                continue;
            }
            let Some(physical) = resource.physical_name() else {
                continue;
            };
            if let Some(owner) = self.global_names.get(physical) {
                return Err(ComposeError::DuplicateName {
                    kind: resource.kind(),
                    name: physical.to_string(),
                    scope: format!("{} and {owner}", stack.name),
                });
            }
            claimed.push(physical.to_string());
        }
        for physical in claimed {
            self.global_names.insert(physical, stack.name.clone());
        }

        self.stacks.push(stack);
        Ok(())
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Stacks in region order
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, region: &str) -> Result<&Stack, ComposeError> {
        self.stacks
            .iter()
            .find(|s| s.region == region)
            .ok_or_else(|| ComposeError::UnknownRegion(region.to_string()))
    }

    /// Manifest entries in region order. Secondary stacks depend on the
    /// primary, whose roles they reference by ARN.
    pub fn manifest(&self) -> Manifest {
        let primary: Vec<String> = self
            .stacks
            .iter()
            .filter(|s| s.is_primary())
            .map(|s| s.name.clone())
            .collect();
        Manifest {
            version: MANIFEST_VERSION,
            branch: self.branch.clone(),
            stacks: self
                .stacks
                .iter()
                .map(|s| ManifestEntry {
                    stack_name: s.name.clone(),
                    region: s.region.clone(),
                    account: s.account.clone(),
                    primary: s.is_primary(),
                    template: s.template_file(),
                    resources: s.resources.len(),
                    tags: s.tags.clone(),
                    depends_on: if s.is_primary() {
                        Vec::new()
                    } else {
                        primary.clone()
                    },
                })
                .collect(),
        }
    }

    /// Write every template and the manifest into `out_dir`
    pub fn write(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        let mut written = Vec::with_capacity(self.stacks.len() + 1);
        for stack in &self.stacks {
            let path = out_dir.join(stack.template_file());
            let content = stack
                .render()
                .with_context(|| format!("Failed to render stack {}", stack.name))?;
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                stack = %stack.name,
                region = %stack.region,
                resources = stack.resources.len(),
                "Wrote template"
            );
            written.push(path);
        }

        let path = out_dir.join(MANIFEST_FILE);
        let mut content = serde_json::to_string_pretty(&self.manifest())?;
        content.push('\n');
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::resource::{LogGroupProps, RoleProps};
    use super::*;
    use crate::testing::fixtures::sample_context;
    use tempfile::TempDir;

    fn log_group(name: &str) -> Resource {
        Resource::new(
            ResourceKind::LogGroup,
            name,
            Properties::LogGroup(LogGroupProps {
                log_group_name: format!("/sw/fis/{name}"),
                retention_in_days: 30,
                tags: Vec::new(),
            }),
        )
    }

    fn role(kind: ResourceKind, name: &str) -> Resource {
        Resource::new(
            kind,
            name,
            Properties::Role(RoleProps {
                role_name: name.to_string(),
                assume_role_policy_document: PolicyDocument::new(vec![
                    PolicyStatement::assume_role("fis.amazonaws.com"),
                ]),
                description: None,
                managed_policy_arns: Vec::new(),
                policies: Vec::new(),
                tags: Vec::new(),
            }),
        )
    }

    #[test]
    fn test_stack_applies_tags() {
        let mut stack = Stack::new(&sample_context("eu-central-1"));
        let added = stack.add(log_group("sw-logs-01")).unwrap();
        let Properties::LogGroup(props) = added.properties() else {
            panic!("expected log group");
        };
        let keys: Vec<_> = props.tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["sw:application", "sw:product", "sw:environment", "sw:cost_center"]
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut stack = Stack::new(&sample_context("eu-central-1"));
        stack.add(log_group("sw-logs-01")).unwrap();
        let err = stack.add(log_group("sw-logs-01")).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateName { .. }), "{err}");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut stack = Stack::new(&sample_context("eu-central-1"));
        let err = stack.add(log_group("has space")).unwrap_err();
        assert!(matches!(err, ComposeError::InvalidName { .. }), "{err}");
    }

    #[test]
    fn test_global_outside_primary_rejected() {
        let mut stack = Stack::new(&sample_context("us-east-1"));
        let err = stack
            .add(role(ResourceKind::FisRole, "sw-exec-role-01"))
            .unwrap_err();
        assert!(
            matches!(&err, ComposeError::GlobalResourceOutsidePrimary { region, .. } if region == "us-east-1"),
            "{err}"
        );
        assert!(stack.resources().is_empty());
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let mut stack = Stack::new(&sample_context("eu-central-1"));
        let err = stack
            .add(log_group("sw-logs-01").depends_on("Undeclared"))
            .unwrap_err();
        assert!(matches!(err, ComposeError::MissingDependency { .. }), "{err}");
    }

    #[test]
    fn test_assembly_rejects_repeated_global_name() {
        let mut primary = Stack::new(&sample_context("eu-central-1"));
        primary
            .add(role(ResourceKind::FisRole, "sw-exec-role-01"))
            .unwrap();

        // A second assembly region that (wrongly) shares the primary's identity
        let mut clone = primary.clone();
        clone.region = "ap-southeast-2".to_string();
        clone.name = "other-stack".to_string();

        let mut assembly = Assembly::new("dev");
        assembly.add_stack(primary).unwrap();
        let err = assembly.add_stack(clone).unwrap_err();
        assert!(
            matches!(&err, ComposeError::DuplicateName { name, .. } if name == "sw-exec-role-01"),
            "{err}"
        );
    }

    #[test]
    fn test_unknown_region() {
        let assembly = Assembly::new("dev");
        assert!(matches!(
            assembly.stack("eu-west-1"),
            Err(ComposeError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_render_has_metadata_and_trailing_newline() {
        let mut stack = Stack::new(&sample_context("eu-central-1"));
        stack.add(log_group("sw-logs-01")).unwrap();
        let rendered = stack.render().unwrap();
        assert!(rendered.ends_with("}\n"));

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        let rules = value["Metadata"]["cdk_nag"]["rules_to_suppress"]
            .as_array()
            .unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0]["id"], "AwsSolutions-S1");
        assert_eq!(value["Resources"]["SwLogs01"]["Type"], "AWS::Logs::LogGroup");
    }

    #[test]
    fn test_write_assembly() {
        let dir = TempDir::new().unwrap();
        let mut stack = Stack::new(&sample_context("eu-central-1"));
        stack.add(log_group("sw-logs-01")).unwrap();
        let mut assembly = Assembly::new("dev");
        assembly.add_stack(stack).unwrap();

        let written = assembly.write(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir
            .path()
            .join("sw-resil-dev-mra-infra-stack-eu-central-1-01.template.json")
            .exists());

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
                .unwrap();
        assert_eq!(manifest["branch"], "dev");
        assert_eq!(manifest["stacks"][0]["primary"], true);
        assert_eq!(manifest["stacks"][0]["resources"], 1);
        assert_eq!(manifest["stacks"][0]["tags"]["sw:cost_center"], "cc-1234");
    }

    #[test]
    fn test_secondary_stacks_depend_on_primary() {
        let mut assembly = Assembly::new("dev");
        assembly
            .add_stack(Stack::new(&sample_context("eu-central-1")))
            .unwrap();
        assembly
            .add_stack(Stack::new(&sample_context("us-east-1")))
            .unwrap();

        let manifest = assembly.manifest();
        assert!(manifest.stacks[0].depends_on.is_empty());
        assert_eq!(
            manifest.stacks[1].depends_on,
            vec!["sw-resil-dev-mra-infra-stack-eu-central-1-01"]
        );
    }
}
