//! Stack tag schema for cloudinfra
//!
//! Every synthesized stack carries the same four tags, and they are applied
//! to every taggable resource in the stack.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `sw:application` | Application identifier (the `product` profile value) |
//! | `sw:product` | Product identifier (the `product` profile value) |
//! | `sw:environment` | Deployment environment (`app_env`) |
//! | `sw:cost_center` | Billing cost center (`cost_center`) |

/// Tag key for the application identifier
pub const TAG_APPLICATION: &str = "sw:application";

/// Tag key for the product identifier
pub const TAG_PRODUCT: &str = "sw:product";

/// Tag key for the deployment environment
pub const TAG_ENVIRONMENT: &str = "sw:environment";

/// Tag key for the cost center
pub const TAG_COST_CENTER: &str = "sw:cost_center";

/// Tag key used on experiment templates for their display name
pub const TAG_NAME: &str = "Name";

/// Tag key used on experiment templates for their environment
pub const TAG_EXPERIMENT_ENVIRONMENT: &str = "Environment";

/// Build the ordered stack tag set.
///
/// Order is fixed so rendered templates are byte-stable.
pub fn stack_tags<'a>(
    product: &'a str,
    environment: &'a str,
    cost_center: &'a str,
) -> [(&'static str, &'a str); 4] {
    [
        (TAG_APPLICATION, product),
        (TAG_PRODUCT, product),
        (TAG_ENVIRONMENT, environment),
        (TAG_COST_CENTER, cost_center),
    ]
}
