use clap::Parser;
use std::time::Duration;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-gateway")]
#[command(about = "Rate limited chat proxy for OpenCode Zen")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Chat completions endpoint
    #[arg(
        short,
        long,
        default_value = "https://opencode.ai/zen/v1/chat/completions"
    )]
    pub upstream_url: String,

    // Bearer credential for the upstream API
    #[arg(long, env = "OPENCODE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Accepted model ids (comma-separated), the first one is the default
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "minimax-m2.5-free,kimi-k2.5-free"
    )]
    pub models: Vec<String>,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 3)]
    pub rate_limit: u32,

    // Rate limit window in seconds (12 hours by default, at most one year)
    #[arg(
        long,
        default_value_t = 43_200,
        value_parser = clap::value_parser!(u64).range(1..=31_536_000)
    )]
    pub rate_window: u64,

    // How often expired quota records are swept, 0 disables the sweep
    #[arg(long, default_value_t = 600)]
    pub sweep_interval: u64,

    // Upstream request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub request_timeout: u64,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Configured model ids with blanks removed.
    pub fn model_list(&self) -> Vec<String> {
        self.models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    }
}
