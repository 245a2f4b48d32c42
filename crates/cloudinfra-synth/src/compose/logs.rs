//! Experiment log group

use crate::config::ConfigurationContext;
use crate::manifest::resource::LogGroupProps;
use crate::manifest::{DeletionPolicy, Properties, Resource};
use crate::naming::NameComposer;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::FIS_LOG_RETENTION_DAYS;

/// Regional log group every experiment writes to; deleted with the stack
pub fn experiment_log_group(ctx: &ConfigurationContext) -> Resource {
    let names = NameComposer::new(ctx);
    Resource::new(
        ResourceKind::LogGroup,
        names.logical(ResourceKind::LogGroup, &[]),
        Properties::LogGroup(LogGroupProps {
            log_group_name: names.log_group(),
            retention_in_days: FIS_LOG_RETENTION_DAYS,
            tags: Vec::new(),
        }),
    )
    .with_deletion_policy(DeletionPolicy::Delete)
}
