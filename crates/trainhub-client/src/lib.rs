//! trainhub-client — talking to a training backend.
//!
//! Implements `TrainingApi` over HTTP with reqwest, and adds the session
//! (token store, capability gate, forced logout), configuration loading and
//! an in-memory backend for tests.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod session;

pub use config::{load_config, load_config_from, TrainhubConfig};
pub use error::{ApiError, SessionError};
pub use http::HttpClient;
pub use mock::MockBackend;
pub use session::{Session, TokenStore};
