use clap::Parser;

use crate::error::{Result, StarHistoryError};
use crate::github::API_BASE_URL;
use crate::history::DEFAULT_MAX_REQUEST_AMOUNT;

#[derive(Parser, Debug, Clone)]
#[command(name = "star-history-server")]
#[command(about = "Star History Server - Serves repository star growth timelines built from GitHub stargazer pages")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Token used when a request carries no Authorization header
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = API_BASE_URL)]
    pub api_base_url: String,

    /// Maximum stargazer pages requested per timeline
    #[arg(long, env = "MAX_REQUEST_AMOUNT", default_value_t = DEFAULT_MAX_REQUEST_AMOUNT)]
    pub max_request_amount: u32,

    /// Upstream request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        if self.max_request_amount == 0 {
            return Err(StarHistoryError::Validation(
                "--max-request-amount must be at least 1".to_string(),
            ));
        }
        if self.request_timeout == 0 {
            return Err(StarHistoryError::Validation(
                "--request-timeout must be at least 1 second".to_string(),
            ));
        }
        url::Url::parse(&self.api_base_url)?;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
