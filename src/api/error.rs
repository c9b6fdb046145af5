//! Error taxonomy shared by every outbound request made by polychat.

use std::error::Error;
use std::fmt;

/// Failures surfaced by the execution and generation workflows.
///
/// Every variant is rendered to the user as a single line; none of them are
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The HTTP layer failed: the request never completed or the server
    /// answered with a non-success status.
    Transport {
        /// Status code when the server answered at all.
        status: Option<u16>,
        /// Short summary of the failure or the response body.
        message: String,
    },

    /// The response did not match the expected contract (missing token,
    /// unparsable body, absent field).
    Protocol(String),

    /// The poll budget ran out while the job was still queued or running.
    Timeout {
        /// Number of status requests issued before giving up.
        attempts: u32,
    },

    /// User-supplied input was rejected before any request was made.
    Validation(String),
}

impl ClientError {
    pub fn network(err: reqwest::Error) -> Self {
        ClientError::Transport {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ClientError::Protocol(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport {
                status: Some(status),
                message,
            } if !message.is_empty() => write!(f, "HTTP error! status: {status} ({message})"),
            ClientError::Transport {
                status: Some(status),
                ..
            } => write!(f, "HTTP error! status: {status}"),
            ClientError::Transport {
                status: None,
                message,
            } => write!(f, "Network error: {message}"),
            ClientError::Protocol(message) => write!(f, "{message}"),
            ClientError::Timeout { attempts } => write!(
                f,
                "Timeout: code execution took too long ({attempts} status checks)"
            ),
            ClientError::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        // Variants carry rendered text only.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status_and_summary() {
        let err = ClientError::Transport {
            status: Some(500),
            message: "internal server error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP error! status: 500 (internal server error)"
        );

        let bare = ClientError::Transport {
            status: Some(404),
            message: String::new(),
        };
        assert_eq!(bare.to_string(), "HTTP error! status: 404");
    }

    #[test]
    fn timeout_reports_attempts() {
        let err = ClientError::Timeout { attempts: 10 };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("10 status checks"));
    }

    #[test]
    fn errors_have_no_underlying_source() {
        let err = ClientError::validation("Image too large");
        assert!(err.is_validation());
        assert!(err.source().is_none());
    }
}
