use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable supplying the routing service API key.
pub const API_KEY_ENV: &str = "OPEN_ROUTER_API_KEY";

/// Model identifier that delegates model selection to the routing service.
pub const AUTO_ROUTE_MODEL: &str = "openrouter/auto";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Maximum attempts per completion request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff in seconds; doubles after each retried attempt
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Ordered model identifiers. Only the first is sent as the routing
    /// target; the default lets the service pick the responding model.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl RoutingConfig {
    pub fn target(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or(AUTO_ROUTE_MODEL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_file")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_file")]
    pub file: PathBuf,
    #[serde(default)]
    pub quiet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            retry_initial_delay: default_retry_initial_delay(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            file: default_input_file(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            quiet: false,
            trace_log: None,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_initial_delay() -> u64 {
    2
}

fn default_models() -> Vec<String> {
    vec![AUTO_ROUTE_MODEL.to_string()]
}

fn default_concurrent_requests() -> usize {
    5
}

fn default_input_file() -> PathBuf {
    PathBuf::from("questions-benchmark.json")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("questions_benchmark_results.json")
}

fn default_worker_threads() -> usize {
    num_cpus::get()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Config {
    /// Loads configuration from a TOML file, or uses built-in defaults when
    /// no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.routing.models.is_empty() {
            anyhow::bail!("routing.models must contain at least one model");
        }

        if self.load.concurrent_requests == 0 {
            anyhow::bail!("concurrent_requests must be greater than 0");
        }

        if self.endpoint.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }

        if self.endpoint.retry_initial_delay == 0 {
            anyhow::bail!("retry_initial_delay must be greater than 0");
        }

        if self.endpoint.timeout == 0 {
            anyhow::bail!("timeout must be greater than 0");
        }

        if self.runtime.worker_threads == 0 {
            anyhow::bail!("worker_threads must be greater than 0");
        }

        Ok(())
    }
}
