pub mod error;
pub mod handlers;
pub mod hub;
pub mod server;
pub mod service;
pub mod settings;
pub mod ws;

pub use error::{ApiError, ServiceError};
pub use hub::{BroadcastHub, Subscription};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
pub use service::SessionService;
pub use settings::{load_settings_from_path, settings_path, Settings};
