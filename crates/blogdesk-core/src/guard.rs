//! Gate evaluated before every route transition.
//!
//! Each transition is decided on its own from two inputs: whether a
//! session token is present, and (for guarded routes) the roles of the
//! user behind that token, fetched fresh every time.
//!
//! | token | target is login | target needs login | outcome                        |
//! |-------|-----------------|--------------------|--------------------------------|
//! | no    | no              | yes                | redirect to login (`next`)     |
//! | no    | no              | no                 | proceed                        |
//! | no    | yes             | -                  | proceed                        |
//! | yes   | yes             | -                  | redirect to home               |
//! | yes   | no              | yes                | role check: proceed/forbidden  |
//! | yes   | no              | no                 | proceed                        |

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use blogdesk_auth::{SessionStore, UserProfile};
use blogdesk_bus::BusPublisher;
use blogdesk_client::{api, DispatchError, RequestDispatcher};
use blogdesk_schema::BusMessage;

use crate::routes::{RouteDescriptor, RouteTable};

/// Query key carrying the originally requested route on a login redirect.
pub const NEXT_QUERY_KEY: &str = "next";

/// Where the current user's profile comes from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn current_user(&self) -> Result<UserProfile, DispatchError>;
}

/// Fetches the profile from the token endpoint through the dispatcher.
pub struct DispatcherProfiles {
    dispatcher: Arc<RequestDispatcher>,
}

impl DispatcherProfiles {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl ProfileSource for DispatcherProfiles {
    async fn current_user(&self) -> Result<UserProfile, DispatchError> {
        api::tokens(&self.dispatcher).current_user().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Proceed,
    RedirectToLogin { next: String },
    RedirectToHome,
    RedirectToForbidden,
}

impl NavigationDecision {
    /// Name of the route the user ends up on.
    pub fn target<'a>(&'a self, requested: &'a str, routes: &'a RouteTable) -> &'a str {
        match self {
            NavigationDecision::Proceed => requested,
            NavigationDecision::RedirectToLogin { .. } => &routes.login().name,
            NavigationDecision::RedirectToHome => &routes.home().name,
            NavigationDecision::RedirectToForbidden => &routes.forbidden().name,
        }
    }

    pub fn query(&self) -> BTreeMap<String, String> {
        let mut query = BTreeMap::new();
        if let NavigationDecision::RedirectToLogin { next } = self {
            query.insert(NEXT_QUERY_KEY.to_string(), next.clone());
        }
        query
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("unknown route: {0}")]
    UnknownRoute(String),
    /// Fail-closed: without a role check the transition stays pending.
    #[error("navigation to {route} held: user profile unavailable")]
    ProfileUnavailable {
        route: String,
        #[source]
        source: DispatchError,
    },
}

/// Outcome that needs no network call, or `None` when roles must be checked.
fn decide_without_profile(has_token: bool, to: &RouteDescriptor) -> Option<NavigationDecision> {
    match (has_token, to.is_login(), to.requires_login()) {
        (false, false, true) => Some(NavigationDecision::RedirectToLogin {
            next: to.name.clone(),
        }),
        (false, _, _) => Some(NavigationDecision::Proceed),
        (true, true, _) => Some(NavigationDecision::RedirectToHome),
        (true, false, true) => None,
        (true, false, false) => Some(NavigationDecision::Proceed),
    }
}

pub struct NavigationGuard {
    routes: Arc<RouteTable>,
    session: Arc<dyn SessionStore>,
    profiles: Arc<dyn ProfileSource>,
    bus: BusPublisher,
}

impl NavigationGuard {
    pub fn new(
        routes: Arc<RouteTable>,
        session: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileSource>,
        bus: BusPublisher,
    ) -> Self {
        Self {
            routes,
            session,
            profiles,
            bus,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn before_each(
        &self,
        from: Option<&str>,
        to: &str,
    ) -> Result<NavigationDecision, NavigationError> {
        let target = self
            .routes
            .get(to)
            .ok_or_else(|| NavigationError::UnknownRoute(to.to_string()))?;

        self.emit(BusMessage::LoadingStarted {
            route: to.to_string(),
        })
        .await;

        let has_token = self.session.token().is_some();
        if let Some(decision) = decide_without_profile(has_token, target) {
            tracing::debug!(from = ?from, to, ?decision, "navigation decided");
            return Ok(decision);
        }

        let user = match self.profiles.current_user().await {
            Ok(user) => user,
            Err(source) => {
                if source.is_centrally_handled() {
                    tracing::warn!(to, "navigation held, profile fetch failed: {source}");
                } else {
                    tracing::warn!(
                        to,
                        "navigation held, profile response unusable (no notice shown): {source}"
                    );
                }
                return Err(NavigationError::ProfileUnavailable {
                    route: to.to_string(),
                    source,
                });
            }
        };

        let decision = if user.has_any_role(&target.required_roles) {
            NavigationDecision::Proceed
        } else {
            tracing::info!(user = %user.name, to, "role check failed");
            NavigationDecision::RedirectToForbidden
        };
        tracing::debug!(from = ?from, to, ?decision, "navigation decided");
        Ok(decision)
    }

    pub async fn after_each(&self, to: &str, decision: &NavigationDecision) {
        self.emit(BusMessage::LoadingFinished {
            route: to.to_string(),
        })
        .await;
        if *decision == NavigationDecision::Proceed {
            self.emit(BusMessage::ScrollReset).await;
        }
    }

    /// Run the full transition: guard, then the post-navigation hooks.
    pub async fn navigate(
        &self,
        from: Option<&str>,
        to: &str,
    ) -> Result<NavigationDecision, NavigationError> {
        let decision = self.before_each(from, to).await?;
        self.after_each(to, &decision).await;
        Ok(decision)
    }

    async fn emit(&self, msg: BusMessage) {
        if let Err(e) = self.bus.publish(msg).await {
            tracing::warn!("failed to publish bus message: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteKind;

    #[test]
    fn decisions_without_profile() {
        let table = RouteTable::console_default();
        let admin = table.get("admin_users").unwrap();
        let public = RouteDescriptor::page("about", "/about");

        assert_eq!(
            decide_without_profile(false, admin),
            Some(NavigationDecision::RedirectToLogin {
                next: "admin_users".into()
            })
        );
        assert_eq!(
            decide_without_profile(false, table.home()),
            Some(NavigationDecision::RedirectToLogin {
                next: "home".into()
            })
        );
        assert_eq!(
            decide_without_profile(false, &public),
            Some(NavigationDecision::Proceed)
        );
        assert_eq!(
            decide_without_profile(false, table.login()),
            Some(NavigationDecision::Proceed)
        );
        assert_eq!(
            decide_without_profile(true, table.login()),
            Some(NavigationDecision::RedirectToHome)
        );
        assert_eq!(decide_without_profile(true, admin), None);
        assert_eq!(decide_without_profile(true, table.home()), None);
        assert_eq!(
            decide_without_profile(true, &public),
            Some(NavigationDecision::Proceed)
        );
    }

    #[test]
    fn login_route_with_roles_is_still_reachable_without_token() {
        let odd = RouteDescriptor::new("login", "/login", RouteKind::Login).with_roles(&["admin"]);
        assert_eq!(
            decide_without_profile(false, &odd),
            Some(NavigationDecision::Proceed)
        );
    }

    #[test]
    fn decision_target_and_query() {
        let table = RouteTable::console_default();
        let to_login = NavigationDecision::RedirectToLogin {
            next: "admin_tags".into(),
        };

        assert_eq!(to_login.target("admin_tags", &table), "login");
        assert_eq!(to_login.query().get(NEXT_QUERY_KEY).unwrap(), "admin_tags");
        assert_eq!(
            NavigationDecision::Proceed.target("admin_tags", &table),
            "admin_tags"
        );
        assert_eq!(
            NavigationDecision::RedirectToForbidden.target("admin_tags", &table),
            "forbidden"
        );
        assert!(NavigationDecision::RedirectToHome.query().is_empty());
    }
}
