//! Fault injection experiment templates
//!
//! One template per [`ExperimentPlan`]. Every template shares the same
//! execution options, log destination and stop condition; only targets and
//! actions differ by kind.

use crate::catalog::{AzSlot, ExperimentPlan};
use crate::config::{AzSettings, ConfigurationContext, Percent};
use crate::manifest::resource::{
    CloudWatchLogsConfiguration, ExperimentAction, ExperimentOptions, ExperimentTarget,
    ExperimentTemplateProps, LogConfiguration, SelectionMode, StopCondition,
};
use crate::manifest::{Handle, Properties, Resource};
use crate::naming::NameComposer;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::{FIS_ACTION_DURATION, FIS_LOG_SCHEMA_VERSION};
use cloudinfra_common::tags::{TAG_EXPERIMENT_ENVIRONMENT, TAG_NAME, TAG_PRODUCT};
use indexmap::IndexMap;

/// Stack resources an experiment refers to
#[derive(Debug, Clone)]
pub struct ExperimentWiring {
    pub role_arn: Handle,
    pub log_group_arn: Handle,
}

/// Targets and actions of one template, before the shared settings
struct Body {
    description: String,
    targets: IndexMap<String, ExperimentTarget>,
    actions: IndexMap<String, ExperimentAction>,
}

impl Body {
    fn new(description: String) -> Self {
        Self {
            description,
            targets: IndexMap::new(),
            actions: IndexMap::new(),
        }
    }

    fn target(mut self, key: &str, target: ExperimentTarget) -> Self {
        self.targets.insert(key.to_string(), target);
        self
    }

    fn action(mut self, key: &str, action: ExperimentAction) -> Self {
        self.actions.insert(key.to_string(), action);
        self
    }
}

pub fn experiment(
    ctx: &ConfigurationContext,
    plan: &ExperimentPlan,
    wiring: &ExperimentWiring,
) -> Resource {
    let names = NameComposer::new(ctx);
    let name = names.compose(&plan.name_segments());
    let body = match plan {
        ExperimentPlan::AzSubnetFailure { az } => az_failure(ctx, *az),
        ExperimentPlan::RdsFailover { db_cluster } => rds_failover(ctx, db_cluster),
        ExperimentPlan::EcsTaskStop { service, percent } => {
            let description =
                format!("Stop ECS Task for service app {service} with percent {percent}");
            let action = ExperimentAction::new("aws:ecs:stop-task").description(format!(
                "ECS Task Stop for service app {service} with percent {percent}"
            ));
            ecs_task(ctx, service, *percent, "ECSTaskStop", description, action)
        }
        ExperimentPlan::EcsTaskCpuStress { service, percent } => {
            let description =
                format!("CPU Stress ECS Task for service app {service} with percent {percent}");
            let action = ExperimentAction::new("aws:ecs:task-cpu-stress")
                .description(format!(
                    "ECS Task CPU Stress for service app {service} with percent {percent}"
                ))
                .param("duration", FIS_ACTION_DURATION)
                .param("installDependencies", "true")
                .param("percent", "100")
                .param("workers", "0");
            ecs_task(ctx, service, *percent, "ECSTaskCPUStress", description, action)
        }
        ExperimentPlan::EcsTaskIoStress { service, percent } => {
            let description =
                format!("IO Stress ECS Task for service app {service} with percent {percent}");
            let action = ExperimentAction::new("aws:ecs:task-io-stress")
                .description(format!(
                    "ECS Task IO Stress for service app {service} with percent {percent}"
                ))
                .param("duration", FIS_ACTION_DURATION)
                .param("installDependencies", "true")
                .param("percent", "80")
                .param("workers", "1");
            ecs_task(ctx, service, *percent, "ECSTaskIOStress", description, action)
        }
        ExperimentPlan::EcsClusterDrain { percent } => cluster_drain(ctx, *percent),
    };

    let mut tags = IndexMap::new();
    tags.insert(TAG_NAME.to_string(), name.clone());
    tags.insert(TAG_EXPERIMENT_ENVIRONMENT.to_string(), ctx.app_env.clone());

    Resource::new(
        ResourceKind::ExperimentTemplate,
        name,
        Properties::ExperimentTemplate(ExperimentTemplateProps {
            description: body.description,
            role_arn: wiring.role_arn.clone(),
            targets: body.targets,
            actions: body.actions,
            stop_conditions: vec![StopCondition {
                source: "none".to_string(),
                value: None,
            }],
            experiment_options: ExperimentOptions {
                account_targeting: "single-account".to_string(),
                empty_target_resolution_mode: "fail".to_string(),
            },
            log_configuration: LogConfiguration {
                cloud_watch_logs_configuration: CloudWatchLogsConfiguration {
                    log_group_arn: wiring.log_group_arn.clone(),
                },
                log_schema_version: FIS_LOG_SCHEMA_VERSION,
            },
            tags,
        }),
    )
}

fn az_settings(ctx: &ConfigurationContext, az: AzSlot) -> &AzSettings {
    match az {
        AzSlot::Az1 => &ctx.network.az1,
        AzSlot::Az2 => &ctx.network.az2,
    }
}

/// Network disruption of one AZ's subnets, with the matching database and
/// cache failovers
fn az_failure(ctx: &ConfigurationContext, az: AzSlot) -> Body {
    let settings = az_settings(ctx, az);
    let subnet_arns = settings.subnets.iter().map(|subnet| {
        format!(
            "arn:aws:ec2:{}:{}:subnet/{subnet}",
            ctx.deployment_region, ctx.workload_account
        )
    });

    Body::new(format!("AZ Power Failure Simulation in {az}"))
        .target(
            "SubnetDown",
            ExperimentTarget::new("aws:ec2:subnet", SelectionMode::All).arns(subnet_arns),
        )
        .target(
            "RDSFailover",
            ExperimentTarget::new("aws:rds:cluster", SelectionMode::All)
                .tag(TAG_PRODUCT, &ctx.product)
                .param("writerAvailabilityZoneIdentifiers", &settings.name),
        )
        .target(
            "ElastiCacheCluster",
            ExperimentTarget::new("aws:elasticache:replicationgroup", SelectionMode::All)
                .tag(TAG_PRODUCT, &ctx.product)
                .param("availabilityZoneIdentifier", &settings.name),
        )
        .action(
            "DisruptNetworkConnectivity",
            ExperimentAction::new("aws:network:disrupt-connectivity")
                .description(format!("Disrupt network connectivity for subnets in {az}"))
                .param("duration", FIS_ACTION_DURATION)
                .param("scope", "all")
                .target("Subnets", "SubnetDown"),
        )
        .action(
            "RDSFailoverAction",
            ExperimentAction::new("aws:rds:failover-db-cluster")
                .description("Aurora Serverless RDS Failover DB")
                .target("Clusters", "RDSFailover"),
        )
        .action(
            "PauseElastiCache",
            ExperimentAction::new("aws:elasticache:replicationgroup-interrupt-az-power")
                .param("duration", FIS_ACTION_DURATION)
                .target("ReplicationGroups", "ElastiCacheCluster"),
        )
        .action(
            "FISWait",
            ExperimentAction::new("aws:fis:wait").param("duration", FIS_ACTION_DURATION),
        )
}

fn rds_failover(ctx: &ConfigurationContext, db_cluster: &str) -> Body {
    let cluster_arn = format!(
        "arn:aws:rds:{}:{}:cluster:{}",
        ctx.deployment_region,
        ctx.workload_account,
        NameComposer::new(ctx).db_cluster(db_cluster)
    );
    let description = format!("Aurora Serverless RDS Failover DB {db_cluster}");

    Body::new(description.clone())
        .target(
            "RDSFailover",
            ExperimentTarget::new("aws:rds:cluster", SelectionMode::All).arns([cluster_arn]),
        )
        .action(
            "RDSFailoverAction",
            ExperimentAction::new("aws:rds:failover-db-cluster")
                .description(description)
                .target("Clusters", "RDSFailover"),
        )
}

/// Task-level experiments share a target keyed `{prefix}` and an action
/// keyed `{prefix}Action`
fn ecs_task(
    ctx: &ConfigurationContext,
    service: &str,
    percent: Percent,
    prefix: &str,
    description: String,
    action: ExperimentAction,
) -> Body {
    let target = ExperimentTarget::new("aws:ecs:task", SelectionMode::Percent(percent.get()))
        .param("cluster", ctx.ecs_cluster_name())
        .param("service", NameComposer::new(ctx).ecs_service(service));

    Body::new(description)
        .target(prefix, target)
        .action(&format!("{prefix}Action"), action.target("Tasks", prefix))
}

fn cluster_drain(ctx: &ConfigurationContext, percent: Percent) -> Body {
    let cluster_arn = format!(
        "arn:aws:ecs:{}:{}:cluster/{}",
        ctx.deployment_region,
        ctx.workload_account,
        ctx.ecs_cluster_name()
    );
    let description = format!("Drain ECS cluster container instances in percent {percent}");

    Body::new(description.clone())
        .target(
            "ECSClusterDrain",
            ExperimentTarget::new("aws:ecs:cluster", SelectionMode::All).arns([cluster_arn]),
        )
        .action(
            "ECSDrain",
            ExperimentAction::new("aws:ecs:drain-container-instances")
                .description(description)
                .param("drainagePercentage", percent.to_string())
                .param("duration", FIS_ACTION_DURATION)
                .target("Clusters", "ECSClusterDrain"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_context;
    use serde_json::json;

    fn wiring() -> ExperimentWiring {
        ExperimentWiring {
            role_arn: Handle::get_att("SwResilDevMraExecRole01", "Arn"),
            log_group_arn: Handle::get_att("SwResilDevMraFisLogs01", "Arn"),
        }
    }

    fn props(resource: &Resource) -> &ExperimentTemplateProps {
        match resource.properties() {
            Properties::ExperimentTemplate(props) => props,
            other => panic!("expected experiment template, got {other:?}"),
        }
    }

    fn percent(value: u8) -> Percent {
        Percent::new(value).unwrap()
    }

    #[test]
    fn test_az_failure_targets_and_actions() {
        let ctx = sample_context("eu-central-1");
        let resource = experiment(
            &ctx,
            &ExperimentPlan::AzSubnetFailure { az: AzSlot::Az1 },
            &wiring(),
        );
        assert_eq!(resource.name(), "sw-resil-dev-mra-azfailure-experiment-az1-01");

        let props = props(&resource);
        assert_eq!(props.description, "AZ Power Failure Simulation in az1");
        assert_eq!(
            props.targets.keys().collect::<Vec<_>>(),
            ["SubnetDown", "RDSFailover", "ElastiCacheCluster"]
        );
        assert_eq!(
            props.actions.keys().collect::<Vec<_>>(),
            [
                "DisruptNetworkConnectivity",
                "RDSFailoverAction",
                "PauseElastiCache",
                "FISWait"
            ]
        );
        assert_eq!(
            props.targets["SubnetDown"].resource_arns,
            vec![
                "arn:aws:ec2:eu-central-1:123456789012:subnet/subnet-0a1",
                "arn:aws:ec2:eu-central-1:123456789012:subnet/subnet-0a2",
            ]
        );
        assert_eq!(props.targets["RDSFailover"].resource_tags["sw:product"], "mra");
        assert_eq!(
            props.targets["ElastiCacheCluster"].parameters["availabilityZoneIdentifier"],
            "euc1-az1"
        );
        assert_eq!(props.actions["FISWait"].parameters["duration"], "PT15M");
    }

    #[test]
    fn test_shared_settings() {
        let ctx = sample_context("eu-central-1");
        let resource = experiment(
            &ctx,
            &ExperimentPlan::RdsFailover {
                db_cluster: "orders-db".to_string(),
            },
            &wiring(),
        );
        let value = serde_json::to_value(&resource).unwrap();
        let props = &value["Properties"];
        assert_eq!(
            props["ExperimentOptions"],
            json!({"AccountTargeting": "single-account", "EmptyTargetResolutionMode": "fail"})
        );
        assert_eq!(props["StopConditions"], json!([{"Source": "none"}]));
        assert_eq!(props["LogConfiguration"]["LogSchemaVersion"], 2);
        assert_eq!(
            props["Tags"]["Name"],
            "sw-resil-dev-mra-rdsfailover-orders-db-experiment-01"
        );
        assert_eq!(props["Tags"]["Environment"], "dev");
        assert_eq!(
            props["Targets"]["RDSFailover"]["ResourceArns"][0],
            "arn:aws:rds:eu-central-1:123456789012:cluster:sw-resil-dev-orders-db-01"
        );
    }

    #[test]
    fn test_task_stop_selects_percent_of_service() {
        let ctx = sample_context("eu-central-1");
        let resource = experiment(
            &ctx,
            &ExperimentPlan::EcsTaskStop {
                service: "svc-a".to_string(),
                percent: percent(25),
            },
            &wiring(),
        );
        let props = props(&resource);
        let target = &props.targets["ECSTaskStop"];
        assert_eq!(target.selection_mode, SelectionMode::Percent(25));
        assert_eq!(target.parameters["cluster"], "sw-resil-dev-ecs-cluster-01");
        assert_eq!(target.parameters["service"], "sw-resil-dev-svc-a-01");
        assert_eq!(props.actions["ECSTaskStopAction"].action_id, "aws:ecs:stop-task");
        assert_eq!(props.actions["ECSTaskStopAction"].targets["Tasks"], "ECSTaskStop");
        assert!(props.actions["ECSTaskStopAction"].parameters.is_empty());
    }

    #[test]
    fn test_stress_parameters() {
        let ctx = sample_context("eu-central-1");
        let cpu = experiment(
            &ctx,
            &ExperimentPlan::EcsTaskCpuStress {
                service: "svc-b".to_string(),
                percent: percent(50),
            },
            &wiring(),
        );
        let action = &props(&cpu).actions["ECSTaskCPUStressAction"];
        assert_eq!(action.parameters["percent"], "100");
        assert_eq!(action.parameters["workers"], "0");

        let io = experiment(
            &ctx,
            &ExperimentPlan::EcsTaskIoStress {
                service: "svc-b".to_string(),
                percent: percent(50),
            },
            &wiring(),
        );
        let action = &props(&io).actions["ECSTaskIOStressAction"];
        assert_eq!(action.action_id, "aws:ecs:task-io-stress");
        assert_eq!(action.parameters["percent"], "80");
        assert_eq!(action.parameters["workers"], "1");
    }

    #[test]
    fn test_cluster_drain() {
        let ctx = sample_context("eu-central-1");
        let resource = experiment(
            &ctx,
            &ExperimentPlan::EcsClusterDrain { percent: percent(30) },
            &wiring(),
        );
        assert_eq!(resource.name(), "sw-resil-dev-mra-ecs-drain-p30-experiment-01");
        let props = props(&resource);
        assert_eq!(
            props.targets["ECSClusterDrain"].resource_arns,
            vec!["arn:aws:ecs:eu-central-1:123456789012:cluster/sw-resil-dev-ecs-cluster-01"]
        );
        assert_eq!(props.actions["ECSDrain"].parameters["drainagePercentage"], "30");
    }
}
