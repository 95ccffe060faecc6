//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `cms.api_endpoint`
pub const ENV_API_ENDPOINT: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding `cms.access_token`
pub const ENV_ACCESS_TOKEN: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,
    pub url: String,

    // Output
    pub public_dir: String,
    pub date_format: String,

    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetravelling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            url: "http://localhost:3000".to_string(),

            public_dir: "public".to_string(),
            date_format: "DD MMM YYYY".to_string(),

            cms: CmsConfig::default(),
            comments: CommentsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Apply `PRISMIC_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_ENDPOINT).ok(),
            std::env::var(ENV_ACCESS_TOKEN).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|v| !v.trim().is_empty()) {
            tracing::debug!("CMS endpoint overridden from environment");
            self.cms.api_endpoint = endpoint;
        }
        if let Some(token) = token.filter(|v| !v.trim().is_empty()) {
            self.cms.access_token = Some(token);
        }
    }

    /// Default configuration file written by `init`
    pub fn template() -> &'static str {
        DEFAULT_CONFIG
    }
}

/// Headless CMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Prismic REST API root, e.g. `https://<repo>.cdn.prismic.io/api/v2`
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl CmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://spacetravelling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 5,
            timeout_secs: 10,
        }
    }
}

/// Comment widget (utterances) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enable: bool,
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            repo: "Guilhermecheng/spacetravelling".to_string(),
            issue_term: "pathname".to_string(),
            theme: "photon-dark".to_string(),
        }
    }
}

/// Development server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 3000,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"# spacetravelling configuration

# Site
title: spacetravelling
description: ""
language: pt-BR
timezone: America/Sao_Paulo
url: http://localhost:3000

# Output
public_dir: public
date_format: DD MMM YYYY

# Headless CMS (Prismic). PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN
# override these values.
cms:
  api_endpoint: https://spacetravelling.cdn.prismic.io/api/v2
  document_type: posts
  page_size: 5
  timeout_secs: 10

# Comments (utterances)
comments:
  enable: true
  repo: Guilhermecheng/spacetravelling
  issue_term: pathname
  theme: photon-dark

server:
  ip: localhost
  port: 3000
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetravelling");
        assert_eq!(config.cms.document_type, "posts");
        assert_eq!(config.cms.page_size, 5);
        assert_eq!(config.comments.issue_term, "pathname");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: en
cms:
  api_endpoint: https://blog.cdn.prismic.io/api/v2
  page_size: 20
comments:
  enable: false
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.language, "en");
        assert_eq!(config.cms.api_endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.cms.page_size, 20);
        assert_eq!(config.cms.timeout_secs, 10);
        assert!(!config.comments.enable);
        assert_eq!(config.comments.theme, "photon-dark");
    }

    #[test]
    fn test_template_parses() {
        let config: SiteConfig = serde_yaml::from_str(SiteConfig::template()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cms.access_token, None);
    }

    #[test]
    fn test_env_overrides_ignore_blank_values() {
        let mut config = SiteConfig::default();
        config.apply_overrides(Some("  ".to_string()), Some("secret".to_string()));
        assert_eq!(config.cms.api_endpoint, CmsConfig::default().api_endpoint);
        assert_eq!(config.cms.access_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_timeout_is_at_least_one_second() {
        let cms = CmsConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(cms.timeout(), Duration::from_secs(1));
    }
}
