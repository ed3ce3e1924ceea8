use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Long-running server with static client files.
    Server,
    /// Function-platform contract: manual CORS, OPTIONS preflight, 405 on other methods.
    Function,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub structured_output: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_upload_bytes: usize,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub analyzer_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_dimension: 1024,
            jpeg_quality: 85,
            analyzer_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub deployment: Deployment,
    pub static_dir: PathBuf,
    pub analyzer: AnalyzerConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = PipelineConfig::default();

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(v) => parse_positive::<usize>("MAX_UPLOAD_BYTES", &v)?,
            None => defaults.max_upload_bytes,
        };
        let max_dimension = match get("MAX_IMAGE_DIMENSION") {
            Some(v) => parse_positive::<u32>("MAX_IMAGE_DIMENSION", &v)?,
            None => defaults.max_dimension,
        };
        let jpeg_quality = match get("JPEG_QUALITY") {
            Some(v) => {
                let q = parse_positive::<u8>("JPEG_QUALITY", &v)?;
                if q > 100 {
                    bail!("JPEG_QUALITY must be between 1 and 100, got {}", q);
                }
                q
            }
            None => defaults.jpeg_quality,
        };
        let analyzer_timeout = match get("ANALYZER_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive::<u64>("ANALYZER_TIMEOUT_SECS", &v)?),
            None => defaults.analyzer_timeout,
        };

        let port = match get("PORT") {
            Some(v) => parse_positive::<u16>("PORT", &v)?,
            None => 3000,
        };

        let deployment = match get("DEPLOYMENT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("server") => Deployment::Server,
            Some("function") | Some("serverless") => Deployment::Function,
            Some(other) => bail!("DEPLOYMENT must be 'server' or 'function', got '{}'", other),
        };

        let structured_output = match get("GEMINI_STRUCTURED_OUTPUT") {
            Some(v) => parse_bool("GEMINI_STRUCTURED_OUTPUT", &v)?,
            None => true,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            deployment,
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "public".to_string())),
            analyzer: AnalyzerConfig {
                api_key: get("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: get("GEMINI_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                structured_output,
            },
            pipeline: PipelineConfig {
                max_upload_bytes,
                max_dimension,
                jpeg_quality,
                analyzer_timeout,
            },
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let parsed: T = value
        .parse()
        .with_context(|| format!("{} must be a positive integer, got '{}'", key, value))?;
    if parsed == T::default() {
        bail!("{} must be greater than zero", key);
    }
    Ok(parsed)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} must be a boolean, got '{}'", key, value),
    }
}
