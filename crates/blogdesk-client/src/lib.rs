pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod interceptors;
pub mod registry;
pub mod request;

pub use config::{BuildEnv, ClientConfig, EndpointsConfig, RequestConfig};
pub use dispatcher::RequestDispatcher;
pub use error::{DispatchError, ErrorClass};
pub use registry::{InFlightRegistry, RequestHandle};
pub use request::RequestOptions;
