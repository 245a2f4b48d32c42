//! IAM policy documents
//!
//! Mirrors the JSON shape IAM expects so documents can be embedded in role
//! and bucket policy declarations.

use serde::Serialize;

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// Statement principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Principal {
    /// `{"Service": "lambda.amazonaws.com"}`
    Service(String),
    /// `{"AWS": "*"}`
    #[serde(rename = "AWS")]
    Aws(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl PolicyStatement {
    /// Allow `actions` on `resources`
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: None,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    /// Trust statement letting a service principal assume the role
    pub fn assume_role(service: &str) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: Some(Principal::Service(service.to_string())),
            action: vec!["sts:AssumeRole".to_string()],
            resource: Vec::new(),
            condition: None,
        }
    }

    pub fn with_sid(mut self, sid: &str) -> Self {
        self.sid = Some(sid.to_string());
        self
    }

    /// True when the statement applies to every resource
    pub fn is_wildcard(&self) -> bool {
        self.resource.iter().any(|r| r == "*")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statement,
        }
    }

    /// Actions granted on `*`
    pub fn wildcard_actions(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .filter(|s| s.effect == Effect::Allow && s.is_wildcard())
            .flat_map(|s| s.action.iter().map(String::as_str))
    }

    /// Every action granted by an Allow statement
    pub fn allowed_actions(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .filter(|s| s.effect == Effect::Allow)
            .flat_map(|s| s.action.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trust_policy_shape() {
        let doc = PolicyDocument::new(vec![PolicyStatement::assume_role("fis.amazonaws.com")]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Service": "fis.amazonaws.com"},
                    "Action": ["sts:AssumeRole"]
                }]
            })
        );
    }

    #[test]
    fn test_wildcard_actions() {
        let doc = PolicyDocument::new(vec![
            PolicyStatement::allow(["s3:GetObject"], ["arn:aws:s3:::b/*"]),
            PolicyStatement::allow(["xray:PutTraceSegments"], ["*"]),
        ]);
        assert_eq!(
            doc.wildcard_actions().collect::<Vec<_>>(),
            vec!["xray:PutTraceSegments"]
        );
        assert_eq!(doc.allowed_actions().count(), 2);
    }
}
