pub mod account;
pub mod config;
pub mod console;
pub mod guard;
pub mod routes;

pub use account::Account;
pub use config::{load_config, AuthConfig, ConsoleConfig, SessionConfig};
pub use console::Console;
pub use guard::{
    DispatcherProfiles, NavigationDecision, NavigationError, NavigationGuard, ProfileSource,
};
pub use routes::{RouteDescriptor, RouteKind, RouteTable, RouteTableError};
