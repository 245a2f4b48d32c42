//! Canary egress security group

use crate::aws::NetworkInfo;
use crate::config::ConfigurationContext;
use crate::manifest::resource::{EgressRule, SecurityGroupProps};
use crate::manifest::{Properties, Resource};
use crate::naming::NameComposer;
use cloudinfra_common::ResourceKind;
use cloudinfra_common::defaults::HTTPS_PORT;

pub const SECURITY_GROUP_DESCRIPTION: &str = "Allow the communication from Canary";

fn https_egress() -> EgressRule {
    EgressRule {
        ip_protocol: "tcp".to_string(),
        from_port: HTTPS_PORT,
        to_port: HTTPS_PORT,
        cidr_ip: None,
        destination_prefix_list_id: None,
        description: None,
    }
}

/// Egress-only group: HTTPS to the VPC CIDR and to the S3 prefix list
pub fn security_group(ctx: &ConfigurationContext, network: &NetworkInfo) -> Resource {
    let name = NameComposer::new(ctx).logical(ResourceKind::SecurityGroup, &[]);
    let to_vpc = EgressRule {
        cidr_ip: Some(network.vpc.cidr_block.clone()),
        description: Some(format!("HTTPS to {}", network.vpc.vpc_id)),
        ..https_egress()
    };
    let to_s3 = EgressRule {
        destination_prefix_list_id: Some(network.prefix_list.prefix_list_id.clone()),
        description: Some("HTTPS to S3".to_string()),
        ..https_egress()
    };

    Resource::new(
        ResourceKind::SecurityGroup,
        name.clone(),
        Properties::SecurityGroup(SecurityGroupProps {
            group_name: name,
            group_description: SECURITY_GROUP_DESCRIPTION.to_string(),
            vpc_id: network.vpc.vpc_id.clone(),
            security_group_egress: vec![to_vpc, to_s3],
            tags: Vec::new(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sample_context, sample_network};

    #[test]
    fn test_egress_only_https() {
        let sg = security_group(&sample_context("eu-central-1"), &sample_network());
        let Properties::SecurityGroup(props) = sg.properties() else {
            panic!("expected security group");
        };
        assert_eq!(props.group_name, "sw-resil-dev-mra-canary-sg-01");
        assert_eq!(props.vpc_id, "vpc-0abc123");
        assert_eq!(props.security_group_egress.len(), 2);
        assert!(
            props
                .security_group_egress
                .iter()
                .all(|r| r.ip_protocol == "tcp" && r.from_port == 443 && r.to_port == 443)
        );
        assert_eq!(
            props.security_group_egress[0].cidr_ip.as_deref(),
            Some("10.20.0.0/16")
        );
        assert_eq!(
            props.security_group_egress[1]
                .destination_prefix_list_id
                .as_deref(),
            Some("pl-6ea54007")
        );

        // No ingress property is ever rendered
        let value = serde_json::to_value(&sg).unwrap();
        assert!(value["Properties"].get("SecurityGroupIngress").is_none());
    }
}
