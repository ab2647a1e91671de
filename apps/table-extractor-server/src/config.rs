//! Configuration management for Table Extractor Server

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::extraction::DEFAULT_BACKEND_TIMEOUT_SECS;
use crate::services::{
    DoclingConfig, LlamaParseConfig, OpenAiConfig, UnstructuredConfig, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_LLAMAPARSE_URL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL, DEFAULT_UNSTRUCTURED_URL,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
    pub docling: DoclingSettings,
    pub llamaparse: LlamaParseSettings,
    pub openai: OpenAiSettings,
    pub unstructured: UnstructuredSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Upper bound for one backend run, in seconds
    pub backend_timeout_secs: u64,
    /// Request timeout for outbound service calls, in seconds
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoclingSettings {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlamaParseSettings {
    pub api_key: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnstructuredSettings {
    pub api_key: Option<String>,
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            extraction: ExtractionConfig {
                backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
                http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            docling: DoclingSettings {
                url: Some("http://localhost:5001".to_string()),
            },
            llamaparse: LlamaParseSettings {
                api_key: None,
                url: DEFAULT_LLAMAPARSE_URL.to_string(),
            },
            openai: OpenAiSettings {
                api_key: None,
                url: DEFAULT_OPENAI_URL.to_string(),
                model: DEFAULT_OPENAI_MODEL.to_string(),
            },
            unstructured: UnstructuredSettings {
                api_key: None,
                url: DEFAULT_UNSTRUCTURED_URL.to_string(),
            },
        }
    }
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// Missing API keys are not an error; the affected backend reports a
    /// credential failure when it runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            extraction: ExtractionConfig {
                backend_timeout_secs: parse_var(
                    "BACKEND_TIMEOUT_SECS",
                    defaults.extraction.backend_timeout_secs,
                )?,
                http_timeout_secs: parse_var(
                    "HTTP_TIMEOUT_SECS",
                    defaults.extraction.http_timeout_secs,
                )?,
            },
            docling: DoclingSettings {
                url: optional_var("DOCLING_URL").or(defaults.docling.url),
            },
            llamaparse: LlamaParseSettings {
                api_key: optional_var("LLAMAPARSE_API_KEY"),
                url: env::var("LLAMAPARSE_URL").unwrap_or(defaults.llamaparse.url),
            },
            openai: OpenAiSettings {
                api_key: optional_var("OPENAI_API_KEY"),
                url: env::var("OPENAI_URL").unwrap_or(defaults.openai.url),
                model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai.model),
            },
            unstructured: UnstructuredSettings {
                api_key: optional_var("UNSTRUCTURED_API_KEY"),
                url: env::var("UNSTRUCTURED_URL").unwrap_or(defaults.unstructured.url),
            },
        })
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.backend_timeout_secs)
    }

    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction.http_timeout_secs)
    }

    pub fn docling_client(&self) -> DoclingConfig {
        DoclingConfig {
            base_url: self.docling.url.clone(),
            timeout: self.http_timeout(),
        }
    }

    pub fn llamaparse_client(&self) -> LlamaParseConfig {
        LlamaParseConfig {
            api_key: self.llamaparse.api_key.clone(),
            base_url: self.llamaparse.url.clone(),
            timeout: self.http_timeout(),
            ..LlamaParseConfig::default()
        }
    }

    pub fn openai_client(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.openai.api_key.clone(),
            base_url: self.openai.url.clone(),
            model: self.openai.model.clone(),
            timeout: self.http_timeout(),
        }
    }

    pub fn unstructured_client(&self) -> UnstructuredConfig {
        UnstructuredConfig {
            api_key: self.unstructured.api_key.clone(),
            url: self.unstructured.url.clone(),
            timeout: self.http_timeout(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Non-empty environment variable
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}
