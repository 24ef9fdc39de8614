use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Build-time switch between the development and production backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEnv {
    #[default]
    Development,
    Production,
}

fn default_development_url() -> String {
    "http://127.0.0.1:8888/".to_string()
}

fn default_production_url() -> String {
    "/api".to_string()
}

fn default_origin() -> String {
    "http://localhost".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_development_url")]
    pub development: String,
    #[serde(default = "default_production_url")]
    pub production: String,
    /// Origin used when the selected endpoint is a bare path such as `/api`.
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            development: default_development_url(),
            production: default_production_url(),
            origin: default_origin(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Value of `X-URL-PATH` when a call does not name its page.
    #[serde(default = "default_page_path")]
    pub page_path: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            page_path: default_page_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub env: BuildEnv,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

impl ClientConfig {
    /// Development config pointing at an explicit base URL.
    pub fn with_base_url(base: impl Into<String>) -> Self {
        Self {
            endpoints: EndpointsConfig {
                development: base.into(),
                ..EndpointsConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn selected_endpoint(&self) -> &str {
        match self.env {
            BuildEnv::Development => &self.endpoints.development,
            BuildEnv::Production => &self.endpoints.production,
        }
    }

    pub fn base_url(&self) -> Result<Url> {
        let raw = self.selected_endpoint();
        if let Ok(url) = Url::parse(raw) {
            if url.has_host() {
                return Ok(url);
            }
        }

        let origin = Url::parse(&self.endpoints.origin)
            .with_context(|| format!("invalid origin {}", self.endpoints.origin))?;
        if origin.cannot_be_a_base() {
            return Err(anyhow!("origin {} cannot be a base URL", origin));
        }
        origin
            .join(raw)
            .with_context(|| format!("invalid endpoint {raw}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_is_the_default_env() {
        let config = ClientConfig::default();
        assert_eq!(config.env, BuildEnv::Development);
        assert_eq!(config.base_url().unwrap().as_str(), "http://127.0.0.1:8888/");
    }

    #[test]
    fn production_path_resolves_against_origin() {
        let config = ClientConfig {
            env: BuildEnv::Production,
            ..ClientConfig::default()
        };
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost/api");
    }

    #[test]
    fn production_absolute_url_is_used_as_is() {
        let mut config = ClientConfig {
            env: BuildEnv::Production,
            ..ClientConfig::default()
        };
        config.endpoints.production = "https://blog.example.com/api/".into();
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://blog.example.com/api/"
        );
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: ClientConfig = serde_yaml::from_str("env: production\n").unwrap();
        assert_eq!(config.env, BuildEnv::Production);
        assert_eq!(config.request.timeout_secs, 30);
        assert_eq!(config.endpoints.production, "/api");
    }
}
