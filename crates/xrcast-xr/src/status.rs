//! Process-wide XR status: the last capability probe plus the live session.
//!
//! `probe` records the capability summary and the session manager records
//! session transitions, so the line shown next to the XR controls always
//! reflects both.

use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::XrMode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XrStatus {
    /// `None` until the runtime has been probed.
    pub capabilities: Option<String>,
    pub session: Option<XrMode>,
}

impl XrStatus {
    pub fn line(&self) -> String {
        let capabilities = self
            .capabilities
            .as_deref()
            .unwrap_or("capabilities not probed");
        match self.session {
            Some(mode) => format!("XR: {} session active | {}", mode.as_str(), capabilities),
            None => format!("XR: idle | {capabilities}"),
        }
    }
}

static XR_STATUS: OnceLock<Mutex<XrStatus>> = OnceLock::new();

fn status() -> MutexGuard<'static, XrStatus> {
    let cell = XR_STATUS.get_or_init(|| Mutex::new(XrStatus::default()));
    match cell.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn current_status() -> XrStatus {
    status().clone()
}

/// Status line shown next to the XR controls.
pub fn xr_status() -> String {
    status().line()
}

pub(crate) fn set_capability_summary(summary: impl Into<String>) {
    status().capabilities = Some(summary.into());
}

pub(crate) fn set_session_status(session: Option<XrMode>) {
    status().session = session;
}
