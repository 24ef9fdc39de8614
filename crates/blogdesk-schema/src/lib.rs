use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Category of a transient user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// No response was received from the backend.
    Unreachable,
    /// The backend answered with a 5xx status.
    ServerFault,
    /// The session token was rejected and has been cleared.
    SessionExpired,
}

impl NoticeKind {
    pub fn default_text(self) -> &'static str {
        match self {
            NoticeKind::Unreachable => "cannot reach the server, try again later or contact an administrator",
            NoticeKind::ServerFault => "internal server error",
            NoticeKind::SessionExpired => "not logged in or the session has expired, please log in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusMessage {
    Notice {
        kind: NoticeKind,
        text: String,
    },
    /// Client-side navigation requested outside of the navigation guard.
    Redirect {
        route: String,
        #[serde(default)]
        query: BTreeMap<String, String>,
    },
    /// The in-flight request registry went from non-empty to empty.
    RequestsSettled,
    LoadingStarted {
        route: String,
    },
    LoadingFinished {
        route: String,
    },
    ScrollReset,
}

impl BusMessage {
    pub fn notice(kind: NoticeKind) -> Self {
        BusMessage::Notice {
            kind,
            text: kind.default_text().to_string(),
        }
    }

    pub fn redirect(route: impl Into<String>) -> Self {
        BusMessage::Redirect {
            route: route.into(),
            query: BTreeMap::new(),
        }
    }
}
