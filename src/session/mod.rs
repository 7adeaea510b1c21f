pub mod config;
pub mod context;
pub mod persistence_session;

pub use config::SessionConfig;
pub use context::{ConcurrencyChecking, InteractionContext};
pub use persistence_session::PersistenceSession;
