pub mod profile;
pub mod session;
pub mod store;

pub use profile::UserProfile;
pub use session::{MemorySessionStore, Session, SessionStore};
pub use store::FileSessionStore;
