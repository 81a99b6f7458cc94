//! HTTP framings of the email dispatch endpoint.
//!
//! Both adapters delegate to the same [`EmailDispatcher`](crate::email::EmailDispatcher);
//! they differ only in method handling, CORS and the success body.

pub mod hosted;
pub mod standalone;

/// Path of the email dispatch endpoint.
pub const SEND_EMAIL_PATH: &str = "/api/send-email";

/// Base64 images make request bodies large.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One function answering every method, as on a serverless host.
    Hosted,
    /// Long-running server process.
    Standalone,
}

impl DispatchMode {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("hosted") | Some("serverless") => DispatchMode::Hosted,
            _ => DispatchMode::Standalone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults_to_standalone() {
        assert_eq!(DispatchMode::parse(None), DispatchMode::Standalone);
        assert_eq!(DispatchMode::parse(Some("Hosted")), DispatchMode::Hosted);
        assert_eq!(DispatchMode::parse(Some("serverless")), DispatchMode::Hosted);
        assert_eq!(DispatchMode::parse(Some("express")), DispatchMode::Standalone);
    }
}
