//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("API error: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        retryable: bool,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error from response details.
    pub fn api(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

fn hint(err: &CliError) -> Option<&'static str> {
    match err {
        CliError::Api { code, .. } if code == "unknown_host" => {
            Some("Hint: Only hosts registered with the master can be drained. Check `hostctl hosts list --state up`.")
        }
        CliError::Api { code, .. } if code == "host_not_down" => {
            Some("Hint: Hosts must be DOWN before maintenance completes. Run `hostctl hosts down` first.")
        }
        CliError::Api { code, .. } if code == "host_not_draining" => {
            Some("Hint: Only DRAINING hosts can be taken down. Run `hostctl hosts drain` first.")
        }
        CliError::Api { code, .. } if code == "maintenance_notification_failed" => {
            Some("Hint: The hosts are DRAINING but tasks on them were not queued for rescheduling.")
        }
        CliError::Api {
            retryable: true, ..
        } => Some("Hint: The orchestration backend failed; the request can be retried."),
        CliError::Network(_) => Some("Hint: Check the host manager address (--api-url / BERTH_API_URL)."),
        _ => None,
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = err.downcast_ref::<CliError>().and_then(hint) {
        eprintln!("\n{}", hint.yellow());
    }
}
