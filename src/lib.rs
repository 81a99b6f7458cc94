pub mod config;
pub mod email;
pub mod error;
pub mod generation;
pub mod image_processing;
pub mod persistence;
pub mod resolution;
pub mod studio;
pub mod template;
pub mod transport;
pub mod web_pages;

use axum::Router;

use crate::config::AppConfig;
use crate::transport::DispatchMode;

/// Full application router: studio pages plus the send-email endpoint in the
/// configured framing.
pub fn app(config: &AppConfig) -> Router {
    let services = config.studio_services();
    let send_email = match config.dispatch_mode() {
        DispatchMode::Hosted => transport::hosted::router(services.dispatcher.clone()),
        DispatchMode::Standalone => transport::standalone::router(services.dispatcher.clone()),
    };
    web_pages::router(services).merge(send_email)
}
