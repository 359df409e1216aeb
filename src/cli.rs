use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "route-bench")]
#[command(author, version, about = "Benchmark an LLM routing API", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (built-in defaults when omitted)
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
