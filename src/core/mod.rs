//! Configuration and session persistence.

mod config;
mod session;

pub use config::{
    BackendConfig, ChatConfig, Config, OutputConfig, TimeoutsConfig, TrackerConfig, BASE_URL_ENV,
};
pub use session::{SavedSession, SessionStore, DATA_DIR_ENV};
