use std::sync::Arc;

use anyhow::{Context, Result};
use blogdesk_auth::{SessionStore, UserProfile};
use blogdesk_client::api::{self, Credentials, LoginStyle};
use blogdesk_client::RequestDispatcher;

/// Login and logout: the only writers of the session besides the
/// dispatcher's 401 handling.
pub struct Account {
    dispatcher: Arc<RequestDispatcher>,
    session: Arc<dyn SessionStore>,
    login_style: LoginStyle,
}

impl Account {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        session: Arc<dyn SessionStore>,
        login_style: LoginStyle,
    ) -> Self {
        Self {
            dispatcher,
            session,
            login_style,
        }
    }

    /// Exchange credentials for a token and store it. Returns the user
    /// when the backend includes it in the token response.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<UserProfile>> {
        let credentials = Credentials::new(username.trim(), password);
        let issued = api::tokens(&self.dispatcher)
            .login(&credentials, self.login_style)
            .await
            .with_context(|| format!("login as {} failed", credentials.username))?;

        self.session
            .set_token(&issued.id)
            .context("store session token")?;
        tracing::info!(user = %credentials.username, "logged in");
        Ok(issued.user)
    }

    /// Local only; the backend keeps no server-side session to end.
    pub fn logout(&self) -> Result<()> {
        self.session.clear().context("clear session")?;
        tracing::info!("logged out");
        Ok(())
    }

    pub async fn whoami(&self) -> Result<UserProfile> {
        let user = api::tokens(&self.dispatcher)
            .current_user()
            .await
            .context("fetch current user")?;
        Ok(user)
    }
}
