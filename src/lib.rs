pub mod benchmark;
pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod report;
pub mod retry;

pub use benchmark::{BenchmarkRunner, Question};
pub use cli::Cli;
pub use client::{ClientConfig, ClientError, Completion, OpenRouterClient};
pub use config::Config;
pub use metrics::Metrics;
pub use report::{BenchmarkReport, ReportBuilder, ResultEntry};
