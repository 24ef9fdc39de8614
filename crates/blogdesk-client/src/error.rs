use blogdesk_schema::NoticeKind;
use reqwest::StatusCode;
use serde_json::Value;

/// Failure categories of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NetworkUnreachable,
    ServerFault,
    Unauthenticated,
    Other,
}

impl ErrorClass {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => Self::Unauthenticated,
            500..=599 => Self::ServerFault,
            _ => Self::Other,
        }
    }

    /// Notice shown once by the dispatcher; `None` leaves the caller in charge.
    pub fn notice(self) -> Option<NoticeKind> {
        match self {
            Self::NetworkUnreachable => Some(NoticeKind::Unreachable),
            Self::ServerFault => Some(NoticeKind::ServerFault),
            Self::Unauthenticated => Some(NoticeKind::SessionExpired),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("cannot reach server: {0}")]
    NetworkUnreachable(String),
    #[error("server fault (status {status})")]
    ServerFault { status: u16, body: Value },
    #[error("not logged in or session expired")]
    Unauthenticated,
    #[error("request failed with status {status}")]
    Other { status: u16, body: Value },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl DispatchError {
    pub fn from_status(status: StatusCode, body: Value) -> Self {
        match ErrorClass::from_status(status) {
            ErrorClass::Unauthenticated => Self::Unauthenticated,
            ErrorClass::ServerFault => Self::ServerFault {
                status: status.as_u16(),
                body,
            },
            _ => Self::Other {
                status: status.as_u16(),
                body,
            },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NetworkUnreachable(_) => ErrorClass::NetworkUnreachable,
            Self::ServerFault { .. } => ErrorClass::ServerFault,
            Self::Unauthenticated => ErrorClass::Unauthenticated,
            Self::Other { .. } | Self::InvalidRequest(_) | Self::Decode(_) => ErrorClass::Other,
        }
    }

    /// True for the categories the dispatcher has already reported to the user.
    pub fn is_centrally_handled(&self) -> bool {
        self.class().notice().is_some()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerFault { status, .. } | Self::Other { status, .. } => Some(*status),
            Self::Unauthenticated => Some(401),
            _ => None,
        }
    }
}
