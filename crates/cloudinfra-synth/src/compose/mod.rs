//! Resource composers
//!
//! Each composer is a pure function from a [`ConfigurationContext`] (plus
//! already-declared handles) to one [`Resource`]. [`compose_stack`] calls
//! them in dependency order and lets [`Stack::add`] enforce the topology,
//! naming and reference invariants.

pub mod canary;
pub mod fis;
pub mod iam;
pub mod logs;
pub mod network;
pub mod storage;

use crate::aws::NetworkInfo;
use crate::catalog::{CanaryTarget, ExperimentCatalog, plan_experiments};
use crate::config::ConfigurationContext;
use crate::error::ComposeError;
use crate::manifest::{Handle, Stack};
use crate::naming::NameComposer;
use crate::topology::should_create;
use canary::CanaryWiring;
use cloudinfra_common::ResourceKind;
use fis::ExperimentWiring;
use tracing::{debug, info};

/// Artifact bucket names of every region, in region order
pub fn artifact_bucket_names(contexts: &[ConfigurationContext]) -> Vec<String> {
    contexts
        .iter()
        .map(|ctx| NameComposer::new(ctx).bucket())
        .collect()
}

/// Compose the full stack for one region.
///
/// `bucket_names` is every region's artifact bucket; the canary role in the
/// primary region is granted access to all of them.
pub fn compose_stack(
    ctx: &ConfigurationContext,
    catalog: &ExperimentCatalog,
    canaries: &[CanaryTarget],
    network: &NetworkInfo,
    bucket_names: &[String],
) -> Result<Stack, ComposeError> {
    let mut stack = Stack::new(ctx);
    let names = NameComposer::new(ctx);

    let bucket = storage::artifact_bucket(ctx);
    let policy = storage::bucket_policy(ctx, &bucket);
    let bucket_name = bucket.physical_name().unwrap_or_default().to_string();
    let bucket_logical_id = stack.add(bucket)?.logical_id().to_string();
    stack.add(policy)?;
    let log_group_arn = stack.add(logs::experiment_log_group(ctx))?.attr("Arn");

    if should_create(ctx, ResourceKind::FisRole) {
        let role_arn = stack.add(iam::fis_role(ctx))?.attr("Arn");
        let wiring = ExperimentWiring {
            role_arn,
            log_group_arn,
        };
        let plans = plan_experiments(ctx, catalog)?;
        for plan in &plans {
            stack.add(fis::experiment(ctx, plan, &wiring))?;
        }
        debug!(region = %ctx.deployment_region, count = plans.len(), "Composed experiments");
    }

    let role_arn = if should_create(ctx, ResourceKind::CanaryRole) {
        stack.add(iam::canary_role(ctx, bucket_names))?.attr("Arn")
    } else {
        Handle::Literal(names.role_arn(ResourceKind::CanaryRole))
    };

    let security_group = stack
        .add(network::security_group(ctx, network))?
        .attr("GroupId");

    let wiring = CanaryWiring {
        role_arn,
        security_group,
        bucket_name,
        bucket_logical_id,
        vpc_id: network.vpc.vpc_id.clone(),
    };
    for target in canaries {
        stack.add(canary::canary(ctx, target, &wiring))?;
    }

    info!(
        stack = %stack.name(),
        region = %stack.region(),
        primary = stack.is_primary(),
        resources = stack.resources().len(),
        "Composed stack"
    );
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExperimentKind, plan_canaries};
    use crate::manifest::Properties;
    use crate::testing::fixtures::{sample_apps, sample_context, sample_network};
    use cloudinfra_common::RegionScope;

    fn compose(region: &str, catalog: &ExperimentCatalog) -> Result<Stack, ComposeError> {
        let contexts = [sample_context("eu-central-1"), sample_context("us-east-1")];
        let ctx = sample_context(region);
        compose_stack(
            &ctx,
            catalog,
            &plan_canaries(&sample_apps()),
            &sample_network(),
            &artifact_bucket_names(&contexts),
        )
    }

    #[test]
    fn test_primary_stack_contents() {
        let stack = compose("eu-central-1", &ExperimentCatalog::default()).unwrap();
        assert_eq!(stack.count(ResourceKind::Bucket), 1);
        assert_eq!(stack.count(ResourceKind::BucketPolicy), 1);
        assert_eq!(stack.count(ResourceKind::LogGroup), 1);
        assert_eq!(stack.count(ResourceKind::FisRole), 1);
        assert_eq!(stack.count(ResourceKind::CanaryRole), 1);
        assert_eq!(stack.count(ResourceKind::SecurityGroup), 1);
        assert_eq!(stack.count(ResourceKind::ExperimentTemplate), 8);
        assert_eq!(stack.count(ResourceKind::Canary), 2);
    }

    #[test]
    fn test_secondary_stack_has_no_global_resources() {
        let stack = compose("us-east-1", &ExperimentCatalog::default()).unwrap();
        assert!(
            stack
                .resources()
                .iter()
                .all(|r| r.kind().scope() == RegionScope::Regional)
        );
        assert_eq!(stack.count(ResourceKind::Canary), 2);
        assert_eq!(stack.resources().len(), 6);
    }

    #[test]
    fn test_secondary_canaries_use_role_arn() {
        let stack = compose("us-east-1", &ExperimentCatalog::default()).unwrap();
        for canary in stack.of_kind(ResourceKind::Canary) {
            let Properties::Canary(props) = canary.properties() else {
                panic!("expected canary");
            };
            assert_eq!(
                props.execution_role_arn,
                Handle::Literal("arn:aws:iam::123456789012:role/sw-resil-dev-mra-canary-role-01".into())
            );
        }
    }

    #[test]
    fn test_primary_canaries_reference_role() {
        let stack = compose("eu-central-1", &ExperimentCatalog::default()).unwrap();
        let role = stack.of_kind(ResourceKind::CanaryRole).next().unwrap();
        let canary = stack.of_kind(ResourceKind::Canary).next().unwrap();
        let Properties::Canary(props) = canary.properties() else {
            panic!("expected canary");
        };
        assert_eq!(props.execution_role_arn, role.attr("Arn"));
    }

    #[test]
    fn test_canary_role_lists_every_region_bucket() {
        let stack = compose("eu-central-1", &ExperimentCatalog::default()).unwrap();
        let role = stack.of_kind(ResourceKind::CanaryRole).next().unwrap();
        let Properties::Role(props) = role.properties() else {
            panic!("expected role");
        };
        let resources = &props.policies[0].policy_document.statement[1].resource;
        assert_eq!(
            resources,
            &vec![
                "arn:aws:s3:::sw-resil-dev-mra-canary-s3-123456789012-eu-central-1-01",
                "arn:aws:s3:::sw-resil-dev-mra-canary-s3-123456789012-us-east-1-01",
            ]
        );
    }

    #[test]
    fn test_enabled_stress_entries_add_experiments() {
        let catalog = ExperimentCatalog::default()
            .with(ExperimentKind::EcsTaskCpuStress, true)
            .with(ExperimentKind::EcsTaskIoStress, true);
        let stack = compose("eu-central-1", &catalog).unwrap();
        assert_eq!(stack.count(ResourceKind::ExperimentTemplate), 16);
    }

    #[test]
    fn test_drain_without_percents_fails() {
        let catalog = ExperimentCatalog::default().with(ExperimentKind::EcsClusterDrain, true);
        let err = compose("eu-central-1", &catalog).unwrap_err();
        assert!(matches!(err, ComposeError::Config(_)), "{err}");
    }

    #[test]
    fn test_colliding_canary_labels_rejected() {
        let apps: Vec<crate::config::ApplicationDescriptor> = serde_json::from_str(
            r#"[
                {"names": ["a-b"], "urls": ["https://a.example.com"], "subnet_id": "subnet-0c1", "canary_name": "c"},
                {"names": ["a"], "urls": ["https://b.example.com"], "subnet_id": "subnet-0c1", "canary_name": "b-c"}
            ]"#,
        )
        .unwrap();
        let ctx = sample_context("us-east-1");
        let err = compose_stack(
            &ctx,
            &ExperimentCatalog::default(),
            &plan_canaries(&apps),
            &sample_network(),
            &artifact_bucket_names(std::slice::from_ref(&ctx)),
        )
        .unwrap_err();
        assert!(
            matches!(&err, ComposeError::DuplicateName { kind: ResourceKind::Canary, name, .. }
                if name == "sw-resil-dev-mra-canary-a-b-c-01"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_composition_is_deterministic() {
        let first = compose("eu-central-1", &ExperimentCatalog::default()).unwrap();
        let second = compose("eu-central-1", &ExperimentCatalog::default()).unwrap();
        assert_eq!(first.render().unwrap(), second.render().unwrap());
    }
}
