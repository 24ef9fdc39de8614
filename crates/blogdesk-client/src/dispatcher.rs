use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use blogdesk_auth::SessionStore;
use blogdesk_bus::BusPublisher;
use blogdesk_schema::BusMessage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{DispatchError, ErrorClass};
use crate::interceptors::{
    classify_response, classify_transport, outgoing_headers, resolve_url, unwrap_body,
};
use crate::registry::InFlightRegistry;
use crate::request::RequestOptions;

/// Route the client is sent to when the backend rejects the session.
pub const LOGIN_ROUTE: &str = "login";

/// Issues every backend call and owns the shared failure policy.
///
/// Unreachable backends, server faults and rejected sessions are reported
/// once here (notice on the bus, plus a session clear and login redirect
/// for 401) and then still returned to the caller.
pub struct RequestDispatcher {
    client: reqwest::Client,
    base_url: Url,
    default_page_path: String,
    session: Arc<dyn SessionStore>,
    registry: InFlightRegistry,
    bus: BusPublisher,
}

impl RequestDispatcher {
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn SessionStore>,
        bus: BusPublisher,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request.timeout_secs))
            .build()
            .context("build http client")?;
        let base_url = config.base_url()?;
        tracing::debug!(%base_url, env = ?config.env, "request dispatcher ready");

        Ok(Self {
            client,
            base_url,
            default_page_path: config.request.page_path.clone(),
            session,
            registry: InFlightRegistry::new(),
            bus,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub async fn dispatch(&self, options: RequestOptions) -> Result<Value, DispatchError> {
        let target = resolve_url(&self.base_url, &options.url)?;
        let token = self.session.token();
        let headers = outgoing_headers(&options, token.as_deref(), &self.default_page_path)?;

        let handle = self.registry.register(&options.url);
        let in_flight = InFlight {
            dispatcher: self,
            url: &options.url,
            armed: true,
        };
        tracing::debug!(method = %options.method, url = %options.url, %handle, "dispatch");

        let mut req = self
            .client
            .request(options.method.clone(), target)
            .headers(headers);
        if !options.params.is_empty() {
            req = req.query(&options.params);
        }
        if let Some(data) = &options.data {
            req = req.body(data.to_string());
        }

        let outcome = match req.send().await {
            Ok(resp) => {
                let status = resp.status();
                match resp.bytes().await {
                    Ok(bytes) => classify_response(status, unwrap_body(&bytes)),
                    Err(e) => Err(classify_transport(&e)),
                }
            }
            Err(e) => Err(classify_transport(&e)),
        };

        in_flight.settle().await;

        match outcome {
            Ok(body) => Ok(body),
            Err(err) => {
                self.handle_failure(&options, &err).await;
                Err(err)
            }
        }
    }

    pub async fn dispatch_json<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<T, DispatchError> {
        let body = self.dispatch(options).await?;
        serde_json::from_value(body).map_err(|e| DispatchError::Decode(e.to_string()))
    }

    async fn settle(&self, url: &str) {
        if self.registry.complete(url) {
            tracing::debug!("all requests settled");
            self.emit(BusMessage::RequestsSettled).await;
        }
    }

    async fn handle_failure(&self, options: &RequestOptions, err: &DispatchError) {
        let class = err.class();
        if class == ErrorClass::Other {
            tracing::debug!(url = %options.url, "request failed: {err}");
            return;
        }

        tracing::warn!(method = %options.method, url = %options.url, "request failed: {err}");

        if class == ErrorClass::Unauthenticated {
            if let Err(e) = self.session.clear() {
                tracing::error!("failed to clear session after 401: {e:#}");
            }
            tracing::info!("session rejected, redirecting to {LOGIN_ROUTE}");
            self.emit(BusMessage::redirect(LOGIN_ROUTE)).await;
        }

        if let Some(kind) = class.notice() {
            self.emit(BusMessage::notice(kind)).await;
        }
    }

    async fn emit(&self, msg: BusMessage) {
        if let Err(e) = self.bus.publish(msg).await {
            tracing::warn!("failed to publish bus message: {e}");
        }
    }
}

/// Keeps a URL registered until its call resolves. A call dropped
/// mid-flight is deregistered on drop, and the settled signal is sent
/// from a spawned task.
struct InFlight<'a> {
    dispatcher: &'a RequestDispatcher,
    url: &'a str,
    armed: bool,
}

impl InFlight<'_> {
    async fn settle(mut self) {
        self.armed = false;
        self.dispatcher.settle(self.url).await;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed || !self.dispatcher.registry.complete(self.url) {
            return;
        }
        tracing::debug!(url = self.url, "request dropped, all requests settled");
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let bus = self.dispatcher.bus.clone();
        runtime.spawn(async move {
            if let Err(e) = bus.publish(BusMessage::RequestsSettled).await {
                tracing::warn!("failed to publish bus message: {e}");
            }
        });
    }
}
