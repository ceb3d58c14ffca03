//! Configuration and CLI argument handling

use clap::Parser;

use crate::state::SlackSettings;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "tomato-timer")]
#[command(about = "Named pomodoro timers over HTTP and Slack slash commands")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20553")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Slack verification token; slash commands are rejected without one
    #[arg(long, env = "SLACK_VERIFICATION_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Slash command this server answers
    #[arg(long, default_value = "/gomato")]
    pub slack_command: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn slack_settings(&self) -> SlackSettings {
        SlackSettings {
            token: self.slack_token.clone().filter(|token| !token.is_empty()),
            command: self.slack_command.clone(),
        }
    }
}
