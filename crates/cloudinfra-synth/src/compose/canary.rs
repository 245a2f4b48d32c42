//! Synthetic HTTP canaries

use crate::catalog::CanaryTarget;
use crate::config::ConfigurationContext;
use crate::manifest::resource::{CanaryCode, CanaryProps, RunConfig, Schedule, VpcConfig};
use crate::manifest::{Handle, Properties, Resource};
use crate::naming::NameComposer;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::{
    CANARY_FAILURE_RETENTION_DAYS, CANARY_HANDLER, CANARY_RUNTIME_VERSION, CANARY_SCHEDULE,
    CANARY_SUCCESS_RETENTION_DAYS, CANARY_TARGET_URL_VAR,
};
use indexmap::IndexMap;

/// Probe run by every canary; reads its URL from `TARGET_URL`
pub const PROBE_SCRIPT: &str = include_str!("canary_probe.py");

/// Stack resources a canary refers to
#[derive(Debug, Clone)]
pub struct CanaryWiring {
    /// `Ref`/`GetAtt` to the role in the primary region, its ARN elsewhere
    pub role_arn: Handle,
    pub security_group: Handle,
    pub bucket_name: String,
    pub bucket_logical_id: String,
    pub vpc_id: String,
}

pub fn canary(ctx: &ConfigurationContext, target: &CanaryTarget, wiring: &CanaryWiring) -> Resource {
    let name = NameComposer::new(ctx).canary(&target.label);
    let artifact_s3_location = format!(
        "s3://{}/canary/{}/{}",
        wiring.bucket_name, ctx.deployment_region, name
    );
    let mut environment_variables = IndexMap::new();
    environment_variables.insert(CANARY_TARGET_URL_VAR.to_string(), target.url.clone());

    Resource::new(
        ResourceKind::Canary,
        name.clone(),
        Properties::Canary(CanaryProps {
            name,
            runtime_version: CANARY_RUNTIME_VERSION.to_string(),
            artifact_s3_location,
            execution_role_arn: wiring.role_arn.clone(),
            code: CanaryCode {
                handler: CANARY_HANDLER.to_string(),
                script: PROBE_SCRIPT.to_string(),
            },
            run_config: RunConfig {
                active_tracing: false,
                environment_variables,
            },
            schedule: Schedule {
                expression: CANARY_SCHEDULE.to_string(),
            },
            vpc_config: VpcConfig {
                vpc_id: wiring.vpc_id.clone(),
                subnet_ids: vec![target.subnet_id.clone()],
                security_group_ids: vec![wiring.security_group.clone()],
            },
            success_retention_period: CANARY_SUCCESS_RETENTION_DAYS,
            failure_retention_period: CANARY_FAILURE_RETENTION_DAYS,
            start_canary_after_creation: true,
            tags: Vec::new(),
        }),
    )
    .depends_on(wiring.bucket_logical_id.clone())
}
