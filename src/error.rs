//! Crate-level error taxonomy
//!
//! Per-instruction failures never surface here: they are captured in
//! `TaskStatus`/`PipelineStatus` records. Only setup errors (configuration,
//! definition validation, I/O before the run starts) propagate to callers.

use crate::config::ConfigError;
use crate::protocol::DefinitionError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Setup errors surfaced to the CLI/API layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid task definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for setup operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(patient[_-]?id|accession[_-]?number)[=:]\s*\S+")
        .expect("identifier pattern is valid")
});

const MAX_MESSAGE_LEN: usize = 500;

/// Sanitize an error message before it is stored in status records.
///
/// Redacts credential-looking fragments and patient identifiers, and bounds
/// the message length so a verbose agent cannot bloat the status payload.
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();
    sanitized = IDENTIFIER_PATTERN
        .replace_all(&sanitized, "${1}=***")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], suffix);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials() {
        let sanitized =
            sanitize_error_message("PACS auth failed: password=hunter2 token: abc123");
        assert!(!sanitized.contains("hunter2"));
        assert!(!sanitized.contains("abc123"));
        assert!(sanitized.contains("password=***"));
        assert!(sanitized.contains("token=***"));
    }

    #[test]
    fn redacts_patient_identifiers() {
        let sanitized = sanitize_error_message("lookup failed for patient_id: PAT-0042");
        assert!(!sanitized.contains("PAT-0042"));
        assert!(sanitized.contains("patient_id=***"));
    }

    #[test]
    fn truncates_long_messages() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(sanitize_error_message("plain failure"), "plain failure");
        assert_eq!(sanitize_error_message(""), "");
    }
}
