//! Monitored application list
//!
//! The per-branch JSON document lists the applications that get synthetic
//! canaries. Each descriptor pairs application names with URLs by position.

use super::ConfigError;
use garde::Validate;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// One monitored application and the URLs probed for it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ApplicationDescriptor {
    /// Canary name fragments, one per URL
    #[serde(alias = "app_names")]
    #[garde(length(min = 1), inner(length(min = 1)))]
    pub names: Vec<String>,

    /// URLs probed by the canaries, paired with `names` by position
    #[serde(alias = "app_urls")]
    #[garde(length(min = 1), custom(validate_urls))]
    pub urls: Vec<String>,

    /// Subnet the canaries attach to
    #[garde(length(min = 1))]
    pub subnet_id: String,

    /// Suffix appended to every canary name of this application
    #[garde(length(min = 1))]
    pub canary_name: String,
}

fn validate_urls(urls: &[String], _ctx: &()) -> garde::Result {
    match urls
        .iter()
        .find(|u| !(u.starts_with("https://") || u.starts_with("http://")))
    {
        Some(bad) => Err(garde::Error::new(format!("'{bad}' is not an http(s) URL"))),
        None => Ok(()),
    }
}

impl ApplicationDescriptor {
    /// (name, url) pairs in document order
    pub fn targets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.urls.iter().map(String::as_str))
    }

    fn check(&self) -> Result<(), String> {
        self.validate().map_err(|report| report.to_string())?;
        if self.names.len() != self.urls.len() {
            return Err(format!(
                "application '{}' has {} names but {} urls",
                self.canary_name,
                self.names.len(),
                self.urls.len()
            ));
        }
        Ok(())
    }
}

/// Parse and validate an application list document
pub fn parse_applications(
    content: &str,
    path: &Path,
) -> Result<Vec<ApplicationDescriptor>, ConfigError> {
    let invalid = |reason: String| ConfigError::ApplicationConfigInvalid {
        path: path.to_path_buf(),
        reason,
    };

    let apps: Vec<ApplicationDescriptor> =
        serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
    for (index, app) in apps.iter().enumerate() {
        app.check().map_err(|e| invalid(format!("entry {index}: {e}")))?;
    }
    Ok(apps)
}

/// Load the application list for a branch
pub fn load_applications(path: &Path) -> Result<Vec<ApplicationDescriptor>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let apps = parse_applications(&content, path)?;
    debug!(path = %path.display(), count = apps.len(), "Loaded application list");
    Ok(apps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::SAMPLE_APPS_JSON;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(content: &str) -> Result<Vec<ApplicationDescriptor>, ConfigError> {
        parse_applications(content, Path::new("apps.json"))
    }

    #[test]
    fn test_load_applications() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE_APPS_JSON}").unwrap();

        let apps = load_applications(file.path()).unwrap();
        assert_eq!(apps.len(), 1);
        let targets: Vec<_> = apps[0].targets().collect();
        assert_eq!(
            targets,
            vec![
                ("orders", "https://orders.example.com/health"),
                ("users", "https://users.example.com/health"),
            ]
        );
    }

    #[test]
    fn test_aliases_accepted() {
        let apps = parse(
            r#"[{"app_names": ["web"], "app_urls": ["https://web.example.com"],
                 "subnet_id": "subnet-1", "canary_name": "ui"}]"#,
        )
        .unwrap();
        assert_eq!(apps[0].names, vec!["web"]);
    }

    #[test]
    fn test_not_a_list() {
        let err = parse(r#"{"names": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ApplicationConfigInvalid { .. }));
    }

    #[test]
    fn test_missing_field() {
        let err = parse(r#"[{"names": ["web"], "urls": ["https://web"], "subnet_id": "s"}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("canary_name"), "{err}");
    }

    #[test]
    fn test_length_mismatch() {
        let err = parse(
            r#"[{"names": ["a", "b"], "urls": ["https://a"], "subnet_id": "s", "canary_name": "c"}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 names but 1 urls"), "{err}");
    }

    #[test]
    fn test_bad_url() {
        let err = parse(
            r#"[{"names": ["a"], "urls": ["ftp://a"], "subnet_id": "s", "canary_name": "c"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ApplicationConfigInvalid { .. }));
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(parse("[]").unwrap().is_empty());
    }
}
