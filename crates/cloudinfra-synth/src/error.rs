//! Composition errors
//!
//! Typed errors raised while declaring resources into stacks. All of them
//! indicate a defect in the naming scheme or composer wiring and abort the
//! whole synthesis before anything is written.

use crate::config::ConfigError;
use cloudinfra_common::ResourceKind;
use thiserror::Error;

/// Resource composition errors
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Two resources composed to the same name
    #[error("duplicate {kind} name '{name}' in {scope}")]
    DuplicateName {
        kind: ResourceKind,
        name: String,
        scope: String,
    },

    /// A composed name violates the provider's naming rules
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: ResourceKind,
        name: String,
        reason: String,
    },

    /// An account-global resource was declared in a secondary region
    #[error("{kind} is account-global: only primary region {primary} may create it, not {region}")]
    GlobalResourceOutsidePrimary {
        kind: ResourceKind,
        region: String,
        primary: String,
    },

    /// Two stacks were assembled for the same region
    #[error("stack '{0}' is already part of the assembly")]
    DuplicateStack(String),

    /// A region has no stack or lookup result
    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    /// A resource references one that was not declared before it
    #[error("'{name}' references undeclared resource '{target}'")]
    MissingDependency { name: String, target: String },

    /// A catalog entry needed configuration that failed to resolve
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComposeError::GlobalResourceOutsidePrimary {
            kind: ResourceKind::FisRole,
            region: "us-east-1".to_string(),
            primary: "eu-central-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "FisRole is account-global: only primary region eu-central-1 may create it, not us-east-1"
        );

        let err = ComposeError::UnknownRegion("ap-south-2".to_string());
        assert_eq!(err.to_string(), "unknown region 'ap-south-2'");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: ComposeError = ConfigError::NoRegions.into();
        assert_eq!(err.to_string(), "no region profiles configured");
    }
}
