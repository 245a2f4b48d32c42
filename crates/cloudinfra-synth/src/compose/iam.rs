//! Execution roles for canaries and experiments
//!
//! Both roles are account-global and only declared in the primary region's
//! stack. Regional stacks refer to the canary role by its ARN.

use super::storage::bucket_arn;
use crate::config::ConfigurationContext;
use crate::manifest::resource::{InlinePolicy, RoleProps};
use crate::manifest::{PolicyDocument, PolicyStatement, Properties, Resource};
use crate::naming::NameComposer;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::FIS_LOG_GROUP_PREFIX;

pub const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const FIS_PRINCIPAL: &str = "fis.amazonaws.com";

/// AWS-managed policies attached to the experiment role
pub const FIS_MANAGED_POLICIES: &[&str] = &[
    "arn:aws:iam::aws:policy/service-role/AWSFaultInjectionSimulatorNetworkAccess",
    "arn:aws:iam::aws:policy/service-role/AWSFaultInjectionSimulatorRDSAccess",
    "arn:aws:iam::aws:policy/service-role/AWSFaultInjectionSimulatorECSAccess",
    "arn:aws:iam::aws:policy/service-role/AWSFaultInjectionSimulatorSSMAccess",
];

/// Canary actions that cannot be scoped to a resource
const CANARY_WILDCARD_ACTIONS: &[&str] = &[
    "s3:ListAllMyBuckets",
    "xray:PutTraceSegments",
    "cloudwatch:PutMetricData",
    "ec2:CreateNetworkInterface",
    "ec2:DescribeNetworkInterfaces",
    "ec2:DeleteNetworkInterface",
];

const FIS_WILDCARD_ACTIONS: &[&str] = &[
    "fis:ListExperimentTemplates",
    "fis:ListActions",
    "fis:ListTargetResourceTypes",
    "fis:ListExperiments",
    "fis:GetTargetResourceType",
    "logs:CreateLogDelivery",
    "logs:UpdateLogDelivery",
    "logs:GetLogDelivery",
    "logs:ListLogDeliveries",
    "ec2:CreateNetworkInterface",
    "ec2:DeleteNetworkInterfacePermission",
    "ec2:DescribeNetworkInterfaces",
    "ec2:CreateNetworkInterfacePermission",
    "ec2:DescribeVpcs",
    "ec2:CreateTags",
    "ec2:DeleteNetworkInterface",
    "ec2:DescribeSubnets",
];

fn role(
    ctx: &ConfigurationContext,
    kind: ResourceKind,
    principal: &str,
    statements: Vec<PolicyStatement>,
    managed_policy_arns: Vec<String>,
) -> Resource {
    let names = NameComposer::new(ctx);
    let role_name = names.role(kind);
    Resource::new(
        kind,
        role_name.clone(),
        Properties::Role(RoleProps {
            assume_role_policy_document: PolicyDocument::new(vec![PolicyStatement::assume_role(
                principal,
            )]),
            description: None,
            managed_policy_arns,
            policies: vec![InlinePolicy {
                policy_name: format!("{role_name}-policy"),
                policy_document: PolicyDocument::new(statements),
            }],
            tags: Vec::new(),
            role_name,
        }),
    )
}

/// Role assumed by every canary in every region.
///
/// `bucket_names` lists the artifact bucket of each region, since canaries
/// outside the primary region run under this same role.
pub fn canary_role(ctx: &ConfigurationContext, bucket_names: &[String]) -> Resource {
    let account = &ctx.workload_account;
    let statements = vec![
        PolicyStatement::allow(
            ["s3:PutObject", "s3:GetObject"],
            bucket_names.iter().map(|b| format!("{}/*", bucket_arn(b))),
        ),
        PolicyStatement::allow(
            ["s3:GetBucketLocation"],
            bucket_names.iter().map(|b| bucket_arn(b)),
        ),
        PolicyStatement::allow(
            ["logs:CreateLogStream", "logs:PutLogEvents", "logs:CreateLogGroup"],
            [format!("arn:aws:logs:*:{account}:log-group:/aws/lambda/*")],
        ),
        PolicyStatement::allow(CANARY_WILDCARD_ACTIONS.iter().copied(), ["*"]),
    ];
    role(
        ctx,
        ResourceKind::CanaryRole,
        LAMBDA_PRINCIPAL,
        statements,
        Vec::new(),
    )
}

/// Role the experiment service runs templates under
pub fn fis_role(ctx: &ConfigurationContext) -> Resource {
    let account = &ctx.workload_account;
    let fis_arns = ["experiment-template", "safety-lever", "action", "experiment"]
        .map(|resource| format!("arn:aws:fis:*:{account}:{resource}/*"));
    let statements = vec![
        PolicyStatement::allow(["fis:*"], fis_arns),
        PolicyStatement::allow(FIS_WILDCARD_ACTIONS.iter().copied(), ["*"]),
        PolicyStatement::allow(
            ["iam:CreateServiceLinkedRole"],
            [format!("arn:aws:iam::{account}:role/*")],
        ),
        PolicyStatement::allow(
            ["logs:CreateLogStream", "logs:PutLogEvents"],
            [format!("arn:aws:logs:*:*:log-group:{FIS_LOG_GROUP_PREFIX}*:*")],
        ),
        PolicyStatement::allow(
            [
                "elasticache:InterruptClusterAzPower",
                "elasticache:TestFailover",
                "elasticache:FailoverGlobalReplicationGroup",
            ],
            [
                format!("arn:aws:elasticache:*:{account}:replicationgroup:*"),
                format!("arn:aws:elasticache::{account}:globalreplicationgroup:*"),
            ],
        ),
    ];
    role(
        ctx,
        ResourceKind::FisRole,
        FIS_PRINCIPAL,
        statements,
        FIS_MANAGED_POLICIES.iter().map(|p| p.to_string()).collect(),
    )
}
