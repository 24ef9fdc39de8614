use std::collections::BTreeMap;

use blogdesk_auth::UserProfile;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dispatcher::RequestDispatcher;
use crate::error::DispatchError;
use crate::interceptors::TOKEN_ENDPOINT;
use crate::request::RequestOptions;

/// Shape of the password login body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStyle {
    /// `{"auth": {"username": .., "password": ..}}`
    #[default]
    Flat,
    /// `{"auth": {"method": "password", "password": {"username": .., "password": ..}}}`
    Nested,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn payload(&self, style: LoginStyle) -> Value {
        match style {
            LoginStyle::Flat => json!({
                "auth": {
                    "username": self.username,
                    "password": self.password,
                }
            }),
            LoginStyle::Nested => json!({
                "auth": {
                    "method": "password",
                    "password": {
                        "username": self.username,
                        "password": self.password,
                    }
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssuedToken {
    pub id: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    token: IssuedToken,
}

pub struct TokenApi<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> TokenApi<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Exchange credentials for a token. Does not touch the session.
    pub async fn login(
        &self,
        credentials: &Credentials,
        style: LoginStyle,
    ) -> Result<IssuedToken, DispatchError> {
        let envelope: TokenEnvelope = self
            .dispatcher
            .dispatch_json(RequestOptions::post(TOKEN_ENDPOINT).with_data(credentials.payload(style)))
            .await?;
        Ok(envelope.token)
    }

    /// The user behind the current session token.
    pub async fn current_user(&self) -> Result<UserProfile, DispatchError> {
        let envelope: TokenEnvelope = self
            .dispatcher
            .dispatch_json(RequestOptions::get(TOKEN_ENDPOINT))
            .await?;
        envelope
            .token
            .user
            .ok_or_else(|| DispatchError::Decode("token response has no user".to_string()))
    }
}
