//! Camera passthrough toggle for Meta headsets.

use tracing::info;

use crate::{XrError, XrResult};

/// Whether the user agent belongs to a Meta / Oculus headset browser.
pub fn is_meta_device(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    ua.contains("oculus") || ua.contains("meta") || ua.contains("quest")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Passthrough {
    pub available: bool,
    pub enabled: bool,
}

impl Passthrough {
    pub fn for_user_agent(user_agent: &str) -> Self {
        Self {
            available: is_meta_device(user_agent),
            enabled: false,
        }
    }

    /// Flip passthrough. Only takes effect while a session is running.
    pub fn toggle(&mut self, session_active: bool) -> XrResult<bool> {
        if !self.available {
            return Err(XrError::Unavailable(
                "passthrough is not available on this device".to_string(),
            ));
        }
        if session_active {
            self.enabled = !self.enabled;
            info!(
                "passthrough {}",
                if self.enabled { "enabled" } else { "disabled" }
            );
        }
        Ok(self.enabled)
    }
}
