//! Experiment catalog and fan-out
//!
//! The catalog lists every experiment family the composers know, each with
//! an explicit enabled flag. Planning expands the enabled families into one
//! [`ExperimentPlan`] per Cartesian combination of their configured inputs,
//! in the order the inputs were listed.

use crate::config::{ApplicationDescriptor, ConfigError, ConfigurationContext, Percent, keys};
use crate::manifest::resource::logical_id;
use crate::naming::NameComposer;
use serde::Serialize;
use std::collections::HashSet;

/// Experiment families
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExperimentKind {
    /// Subnet connectivity loss plus RDS/ElastiCache failover, per AZ
    AzSubnetFailure,
    /// Writer failover, per database cluster
    RdsFailover,
    /// Stop a percentage of a service's tasks, per service and percentage
    EcsTaskStop,
    /// CPU stress on a percentage of a service's tasks
    EcsTaskCpuStress,
    /// IO stress on a percentage of a service's tasks
    EcsTaskIoStress,
    /// Drain a percentage of the cluster's container instances
    EcsClusterDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub kind: ExperimentKind,
    pub enabled: bool,
}

/// Ordered set of experiment families with their enabled flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for ExperimentCatalog {
    /// Stress and drain experiments are disabled pending product sign-off.
    fn default() -> Self {
        use ExperimentKind::*;
        let entry = |kind, enabled| CatalogEntry { kind, enabled };
        Self {
            entries: vec![
                entry(AzSubnetFailure, true),
                entry(EcsTaskStop, true),
                entry(EcsTaskCpuStress, false),
                entry(EcsTaskIoStress, false),
                entry(EcsClusterDrain, false),
                entry(RdsFailover, true),
            ],
        }
    }
}

impl ExperimentCatalog {
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_enabled(&self, kind: ExperimentKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind && e.enabled)
    }

    /// Return a copy with `kind` switched on or off
    pub fn with(mut self, kind: ExperimentKind, enabled: bool) -> Self {
        match self.entries.iter_mut().find(|e| e.kind == kind) {
            Some(entry) => entry.enabled = enabled,
            None => self.entries.push(CatalogEntry { kind, enabled }),
        }
        self
    }
}

/// One of the two availability zones configured per region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AzSlot {
    Az1,
    Az2,
}

/// One experiment to compose, with its distinguishing parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExperimentPlan {
    AzSubnetFailure { az: AzSlot },
    RdsFailover { db_cluster: String },
    EcsTaskStop { service: String, percent: Percent },
    EcsTaskCpuStress { service: String, percent: Percent },
    EcsTaskIoStress { service: String, percent: Percent },
    EcsClusterDrain { percent: Percent },
}

impl ExperimentPlan {
    pub fn kind(&self) -> ExperimentKind {
        match self {
            ExperimentPlan::AzSubnetFailure { .. } => ExperimentKind::AzSubnetFailure,
            ExperimentPlan::RdsFailover { .. } => ExperimentKind::RdsFailover,
            ExperimentPlan::EcsTaskStop { .. } => ExperimentKind::EcsTaskStop,
            ExperimentPlan::EcsTaskCpuStress { .. } => ExperimentKind::EcsTaskCpuStress,
            ExperimentPlan::EcsTaskIoStress { .. } => ExperimentKind::EcsTaskIoStress,
            ExperimentPlan::EcsClusterDrain { .. } => ExperimentKind::EcsClusterDrain,
        }
    }

    /// Name segments between the application name and the suffix
    pub fn name_segments(&self) -> Vec<String> {
        let task = |family: &str, service: &str, percent: &Percent| {
            vec![
                format!("ecs-{family}"),
                service.to_string(),
                format!("p{percent}"),
                "experiment".to_string(),
            ]
        };
        match self {
            ExperimentPlan::AzSubnetFailure { az } => {
                vec!["azfailure".into(), "experiment".into(), az.to_string()]
            }
            ExperimentPlan::RdsFailover { db_cluster } => {
                vec!["rdsfailover".into(), db_cluster.clone(), "experiment".into()]
            }
            ExperimentPlan::EcsTaskStop { service, percent } => task("taskstop", service, percent),
            ExperimentPlan::EcsTaskCpuStress { service, percent } => {
                task("taskcpustress", service, percent)
            }
            ExperimentPlan::EcsTaskIoStress { service, percent } => {
                task("taskiostress", service, percent)
            }
            ExperimentPlan::EcsClusterDrain { percent } => {
                vec!["ecs-drain".into(), format!("p{percent}"), "experiment".into()]
            }
        }
    }
}

/// Expand the enabled catalog entries for one context.
///
/// Keys read only by disabled entries are never required. Fails when two
/// plans compose to the same name or template logical id.
pub fn plan_experiments(
    ctx: &ConfigurationContext,
    catalog: &ExperimentCatalog,
) -> Result<Vec<ExperimentPlan>, ConfigError> {
    let mut plans = Vec::new();
    let task_fanout = |make: fn(String, Percent) -> ExperimentPlan| {
        ctx.ecs_services
            .iter()
            .flat_map(|service| {
                ctx.ecs_task_percents
                    .iter()
                    .map(move |percent| make(service.clone(), *percent))
            })
            .collect::<Vec<_>>()
    };

    for entry in catalog.entries().iter().filter(|e| e.enabled) {
        match entry.kind {
            ExperimentKind::AzSubnetFailure => {
                plans.push(ExperimentPlan::AzSubnetFailure { az: AzSlot::Az1 });
                plans.push(ExperimentPlan::AzSubnetFailure { az: AzSlot::Az2 });
            }
            ExperimentKind::RdsFailover => {
                plans.extend(ctx.db_clusters.iter().map(|db| ExperimentPlan::RdsFailover {
                    db_cluster: db.clone(),
                }));
            }
            ExperimentKind::EcsTaskStop => {
                plans.extend(task_fanout(|service, percent| {
                    ExperimentPlan::EcsTaskStop { service, percent }
                }));
            }
            ExperimentKind::EcsTaskCpuStress => {
                plans.extend(task_fanout(|service, percent| {
                    ExperimentPlan::EcsTaskCpuStress { service, percent }
                }));
            }
            ExperimentKind::EcsTaskIoStress => {
                plans.extend(task_fanout(|service, percent| {
                    ExperimentPlan::EcsTaskIoStress { service, percent }
                }));
            }
            ExperimentKind::EcsClusterDrain => {
                let percents = ctx.required_percents(keys::ECS_DRAIN_PERCENTS)?;
                plans.extend(
                    percents
                        .into_iter()
                        .map(|percent| ExperimentPlan::EcsClusterDrain { percent }),
                );
            }
        }
    }

    let names = NameComposer::new(ctx);
    let mut seen = HashSet::new();
    for plan in &plans {
        let name = names.compose(&plan.name_segments());
        if !seen.insert(logical_id(&name)) {
            return Err(ConfigError::DuplicateParameter {
                key: plan.kind().to_string(),
                value: name,
            });
        }
    }
    Ok(plans)
}

/// One canary to compose
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanaryTarget {
    /// `{app name}-{canary name}`, inserted into the canary's name
    pub label: String,
    pub url: String,
    pub subnet_id: String,
}

/// One canary per (application, URL) pair, in document order
pub fn plan_canaries(apps: &[ApplicationDescriptor]) -> Vec<CanaryTarget> {
    apps.iter()
        .flat_map(|app| {
            app.targets().map(|(name, url)| CanaryTarget {
                label: format!("{name}-{}", app.canary_name),
                url: url.to_string(),
                subnet_id: app.subnet_id.clone(),
            })
        })
        .collect()
}
