//! Primary-region gating
//!
//! Account-global resources (IAM roles, experiment templates) are created
//! only in the primary region; regional resources are created everywhere.

use crate::config::ConfigurationContext;
use cloudinfra_common::{RegionScope, ResourceKind};

/// True when the context's deployment region is the primary region
pub fn is_primary(ctx: &ConfigurationContext) -> bool {
    ctx.deployment_region == ctx.primary_region
}

/// Whether a resource of `kind` belongs in the context's stack
pub fn should_create(ctx: &ConfigurationContext, kind: ResourceKind) -> bool {
    match kind.scope() {
        RegionScope::Global => is_primary(ctx),
        RegionScope::Regional => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_context;

    #[test]
    fn test_exactly_one_primary() {
        let regions = ["eu-central-1", "us-east-1", "ap-southeast-2"];
        let primaries: Vec<_> = regions
            .iter()
            .filter(|r| is_primary(&sample_context(r)))
            .collect();
        assert_eq!(primaries, vec![&"eu-central-1"]);
    }

    #[test]
    fn test_global_kinds_only_in_primary() {
        let primary = sample_context("eu-central-1");
        let secondary = sample_context("us-east-1");
        assert!(should_create(&primary, ResourceKind::FisRole));
        assert!(!should_create(&secondary, ResourceKind::FisRole));
        assert!(!should_create(&secondary, ResourceKind::ExperimentTemplate));
        assert!(should_create(&secondary, ResourceKind::Canary));
        assert!(should_create(&secondary, ResourceKind::LogGroup));
    }
}
