use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use blogdesk_auth::{FileSessionStore, SessionStore};
use blogdesk_bus::EventBus;
use blogdesk_client::RequestDispatcher;

use crate::account::Account;
use crate::config::{load_config, ConsoleConfig};
use crate::guard::{DispatcherProfiles, NavigationGuard};
use crate::routes::RouteTable;

const BUS_CAPACITY: usize = 64;

/// One running client: a single session, dispatcher and guard sharing one bus.
pub struct Console {
    pub config: ConsoleConfig,
    pub bus: EventBus,
    pub session: Arc<dyn SessionStore>,
    pub dispatcher: Arc<RequestDispatcher>,
    pub guard: NavigationGuard,
    pub account: Account,
}

impl Console {
    /// Build from `<config_root>/config/console.yaml` with a file-backed session.
    pub fn open(config_root: &Path) -> Result<Self> {
        let config_dir = config_root.join("config");
        let config = load_config(&config_dir)?;

        let session: Arc<dyn SessionStore> = match config.session_dir(&config_dir) {
            Some(dir) => Arc::new(FileSessionStore::from_config_dir(dir)?),
            None => Arc::new(FileSessionStore::new()?),
        };
        let routes = match config.routes_path(&config_dir) {
            Some(path) => RouteTable::load(&path)?,
            None => RouteTable::console_default(),
        };

        Self::assemble(config, session, routes)
    }

    pub fn assemble(
        config: ConsoleConfig,
        session: Arc<dyn SessionStore>,
        routes: RouteTable,
    ) -> Result<Self> {
        let bus = EventBus::new(BUS_CAPACITY);
        let dispatcher = Arc::new(RequestDispatcher::new(
            &config.client,
            session.clone(),
            bus.publisher(),
        )?);
        let guard = NavigationGuard::new(
            Arc::new(routes),
            session.clone(),
            Arc::new(DispatcherProfiles::new(dispatcher.clone())),
            bus.publisher(),
        );
        let account = Account::new(
            dispatcher.clone(),
            session.clone(),
            config.auth.login_style,
        );

        Ok(Self {
            config,
            bus,
            session,
            dispatcher,
            guard,
            account,
        })
    }
}
