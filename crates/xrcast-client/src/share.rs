//! Ports towards the surrounding caster: its screen share and its UI.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use tracing::{info, warn};
use xrcast_web::{MediaStream, StreamSource};
use xrcast_xr::Affordances;

use crate::{ClientError, ClientResult};

/// The caster's screen-sharing state.
pub trait ScreenShare: Send + Sync {
    fn is_sharing(&self) -> bool;

    /// The outgoing stream while sharing.
    fn local_stream(&self) -> Option<MediaStream>;

    fn start_screen_share(&self) -> ClientResult<()>;

    fn stop_screen_share(&self);
}

/// Feeds the caster's outgoing stream to the headset coordinator.
pub struct ShareStream(Arc<dyn ScreenShare>);

impl ShareStream {
    pub fn new(share: Arc<dyn ScreenShare>) -> Self {
        Self(share)
    }
}

impl StreamSource for ShareStream {
    fn local_stream(&self) -> Option<MediaStream> {
        self.0.local_stream()
    }
}

/// User-facing feedback from the XR layer.
pub trait UserNotifier: Send + Sync {
    /// Blocking message for something the user asked for but cannot have.
    fn alert(&self, message: &str);

    fn capabilities(&self, summary: &str, affordances: &Affordances);

    fn session_changed(&self, _active: bool) {}
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn alert(&self, message: &str) {
        warn!("alert: {}", message);
    }

    fn capabilities(&self, summary: &str, affordances: &Affordances) {
        info!(
            ar = affordances.ar_button,
            hand_tracking = affordances.hand_tracking_button,
            passthrough = affordances.passthrough_toggle,
            "{}",
            summary
        );
    }

    fn session_changed(&self, active: bool) {
        info!("XR session {}", if active { "active" } else { "ended" });
    }
}

/// In-process screen share producing a synthetic capture stream.
pub struct SimulatedShare {
    sharing: AtomicBool,
    with_audio: bool,
    fail_start: bool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl Default for SimulatedShare {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SimulatedShare {
    pub fn new(with_audio: bool) -> Self {
        Self {
            sharing: AtomicBool::new(false),
            with_audio,
            fail_start: false,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// Start out already sharing.
    pub fn sharing(self) -> Self {
        self.sharing.store(true, Ordering::SeqCst);
        self
    }

    /// Make every start request fail, as when the user denies capture.
    pub fn denying(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl ScreenShare for SimulatedShare {
    fn is_sharing(&self) -> bool {
        self.sharing.load(Ordering::SeqCst)
    }

    fn local_stream(&self) -> Option<MediaStream> {
        self.is_sharing()
            .then(|| MediaStream::screen_capture("simulated-screen", self.with_audio))
    }

    fn start_screen_share(&self) -> ClientResult<()> {
        if self.fail_start {
            return Err(ClientError::Share("screen capture permission denied".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.sharing.store(true, Ordering::SeqCst);
        info!("screen share started");
        Ok(())
    }

    fn stop_screen_share(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sharing.store(false, Ordering::SeqCst);
        info!("screen share stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_only_while_sharing() {
        let share = Arc::new(SimulatedShare::new(false));
        let source = ShareStream::new(share.clone());
        assert!(source.local_stream().is_none());

        share.start_screen_share().unwrap();
        let stream = source.local_stream().unwrap();
        assert_eq!(stream.tracks.len(), 1);

        share.stop_screen_share();
        assert!(source.local_stream().is_none());
        assert_eq!((share.start_count(), share.stop_count()), (1, 1));
    }

    #[test]
    fn test_denied_start_keeps_state() {
        let share = SimulatedShare::default().denying();
        assert!(share.start_screen_share().is_err());
        assert!(!share.is_sharing());
    }
}
