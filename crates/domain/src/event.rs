//! Events published by the API access layer for presentation collaborators.

use serde::{Deserialize, Serialize};

/// Kind of an `api-error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// The request exceeded its deadline.
    Timeout,
    /// The backend answered 500.
    Server,
    /// The backend rejected the payload with 400.
    Validation,
}

impl ApiErrorKind {
    /// Returns the kind as it appears in the event payload.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Server => "server",
            Self::Validation => "validation",
        }
    }

    /// Message used when the backend did not provide one.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Timeout => "The server took too long to respond. Please try again.",
            Self::Server => "Something went wrong on the server. Please try again later.",
            Self::Validation => "The submitted data is invalid.",
        }
    }
}

/// Cross-cutting notification emitted by the API access layer.
///
/// The set is closed; subscribers match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ApiEvent {
    /// The session could not be renewed; the user must log in again.
    SessionExpired,
    /// A mutating request was rejected with 403.
    PermissionDenied {
        /// Message for the user.
        message: String,
        /// URL of the rejected request.
        url: String,
    },
    /// A request failed in a way the user should be told about.
    ApiError {
        /// What kind of failure.
        #[serde(rename = "type")]
        kind: ApiErrorKind,
        /// Message for the user.
        message: String,
    },
}

impl ApiEvent {
    /// Default message for `permission-denied`.
    pub const PERMISSION_DENIED_MESSAGE: &'static str =
        "You do not have permission to perform this action.";

    /// Returns the event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SessionExpired => "session-expired",
            Self::PermissionDenied { .. } => "permission-denied",
            Self::ApiError { .. } => "api-error",
        }
    }

    /// Builds an `api-error` event, falling back to the default message.
    #[must_use]
    pub fn api_error(kind: ApiErrorKind, message: Option<String>) -> Self {
        Self::ApiError {
            kind,
            message: message.unwrap_or_else(|| kind.default_message().to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        assert_eq!(ApiEvent::SessionExpired.name(), "session-expired");
        assert_eq!(
            ApiEvent::api_error(ApiErrorKind::Server, None).name(),
            "api-error"
        );
    }

    #[test]
    fn test_api_error_default_message() {
        let event = ApiEvent::api_error(ApiErrorKind::Validation, None);
        assert_eq!(
            event,
            ApiEvent::ApiError {
                kind: ApiErrorKind::Validation,
                message: "The submitted data is invalid.".to_string(),
            }
        );
    }

    #[test]
    fn test_event_payload_shape() {
        let event = ApiEvent::api_error(ApiErrorKind::Timeout, Some("slow".to_string()));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "api-error", "type": "timeout", "message": "slow"})
        );

        let denied = ApiEvent::PermissionDenied {
            message: "nope".to_string(),
            url: "https://fleet.example.com/api/buses".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&denied).unwrap()["event"],
            "permission-denied"
        );
    }
}
