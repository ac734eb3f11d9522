use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use glam::Vec3;
use xrcast_client::{
    BaseVrEntry, ClientError, Collaborators, EnhancedFeatures, EntryPath, ExtendedCaster, MemoryStore,
    ScreenShare, SessionSettings, SessionStore, SettingsControls, SettingsForm, ShareStream,
    SimulatedShare, UserNotifier, SESSION_KEY,
};
use xrcast_web::{
    HeadsetEntry, LocalSignaling, LoopbackPeerFactory, MultiPeerCoordinator, PeerConfig,
};
use xrcast_xr::dummy::{idle_frame, SimulatedRuntime};
use xrcast_xr::gesture::{INDEX_METACARPAL, INDEX_TIP, THUMB_TIP};
use xrcast_xr::{
    Affordances, GamepadButton, HandJointSet, Handedness, InputSourceFrame, JointPose,
    SessionState, XrError, XrMode,
};

const QUEST_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; Quest 3) OculusBrowser/33.0";
const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
    summaries: Mutex<Vec<(String, Affordances)>>,
    sessions: Mutex<Vec<bool>>,
}

impl UserNotifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn capabilities(&self, summary: &str, affordances: &Affordances) {
        self.summaries
            .lock()
            .unwrap()
            .push((summary.to_string(), *affordances));
    }

    fn session_changed(&self, active: bool) {
        self.sessions.lock().unwrap().push(active);
    }
}

struct Harness {
    features: Arc<EnhancedFeatures>,
    share: Arc<SimulatedShare>,
    notifier: Arc<RecordingNotifier>,
    store: Arc<MemoryStore>,
    controls: Arc<SettingsForm>,
    peers: Arc<LoopbackPeerFactory>,
}

fn harness(runtime: SimulatedRuntime, share: SimulatedShare, user_agent: &str) -> Harness {
    harness_on(Arc::new(runtime), share, user_agent)
}

fn harness_on(
    runtime: Arc<SimulatedRuntime>,
    share: SimulatedShare,
    user_agent: &str,
) -> Harness {
    let share = Arc::new(share);
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());
    let controls = Arc::new(SettingsForm::default());
    let peers = Arc::new(LoopbackPeerFactory::new());
    let (signaling, _rx) = LocalSignaling::new();
    let coordinator = Arc::new(MultiPeerCoordinator::new(
        PeerConfig::default(),
        peers.clone(),
        Arc::new(signaling),
        Arc::new(ShareStream::new(share.clone())),
    ));
    let features = Arc::new(EnhancedFeatures::new(
        runtime,
        coordinator,
        Collaborators {
            share: share.clone(),
            notifier: notifier.clone(),
            store: store.clone(),
            controls: controls.clone(),
        },
        user_agent,
    ));
    Harness {
        features,
        share,
        notifier,
        store,
        controls,
        peers,
    }
}

fn hand_capable_runtime() -> SimulatedRuntime {
    SimulatedRuntime::new().with_features(&["immersive-vr", "local-floor", "hand-tracking"])
}

fn pinching_right_hand() -> InputSourceFrame {
    let joints = HandJointSet::new()
        .with_joint(INDEX_METACARPAL, JointPose::at(Vec3::new(0.1, 1.2, -0.2)))
        .with_joint(INDEX_TIP, JointPose::at(Vec3::new(0.1, 1.2, -0.27)))
        .with_joint(THUMB_TIP, JointPose::at(Vec3::new(0.11, 1.2, -0.27)));
    InputSourceFrame {
        id: 9,
        handedness: Handedness::Right,
        hand: Some(joints),
        ..Default::default()
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn entry(id: &str) -> HeadsetEntry {
    HeadsetEntry {
        id: id.to_string(),
        connection: format!("local://{id}"),
    }
}

#[test]
fn initialize_reports_capabilities_and_affordances() {
    let h = harness(hand_capable_runtime(), SimulatedShare::default(), QUEST_UA);

    let report = h.features.initialize();
    assert!(report.supports("hand-tracking"));
    assert!(!report.supports("immersive-ar"));

    let summaries = h.notifier.summaries.lock().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].0, "Features: VR, Hand Tracking");
    assert_eq!(
        summaries[0].1,
        Affordances {
            ar_button: false,
            hand_tracking_button: true,
            passthrough_toggle: true,
        }
    );
    assert!(h.features.passthrough().available);
}

#[test]
fn hand_tracking_toggle_requires_support() {
    let h = harness(SimulatedRuntime::new(), SimulatedShare::default(), DESKTOP_UA);
    h.features.initialize();

    assert!(!h.features.toggle_hand_tracking());
    assert!(!h.features.hand_tracking_enabled());
    assert_eq!(h.notifier.alerts.lock().unwrap().len(), 1);

    let h = harness(hand_capable_runtime(), SimulatedShare::default(), DESKTOP_UA);
    h.features.initialize();
    assert!(h.features.toggle_hand_tracking());
    assert!(!h.features.toggle_hand_tracking());
    assert!(h.notifier.alerts.lock().unwrap().is_empty());
}

#[test]
fn trigger_press_starts_screen_share() {
    let runtime = SimulatedRuntime::new()
        .with_frame_limit(1)
        .with_script(Arc::new(|seq| {
            let mut frame = idle_frame(seq);
            if let Some(gamepad) = frame.input_sources[0].gamepad.as_mut() {
                gamepad.buttons[0] = GamepadButton {
                    pressed: true,
                    value: 1.0,
                };
            }
            frame
        }));
    let h = harness(runtime, SimulatedShare::default(), DESKTOP_UA);

    h.features.enter(XrMode::Vr).unwrap();
    h.features.wait_for_session_end();

    assert_eq!(h.features.session_state(), SessionState::Idle);
    assert!(h.share.is_sharing());
    assert_eq!(h.share.start_count(), 1);
    assert_eq!(*h.notifier.sessions.lock().unwrap(), vec![true, false]);
    // Session-scoped input state is dropped when the session ends.
    assert_eq!(h.features.controller_count(), 0);
    assert!(h.features.virtual_screen().is_none());
}

#[test]
fn right_pinch_toggles_share_only_with_hand_tracking() {
    let script = || {
        SimulatedRuntime::new()
            .with_features(&["immersive-vr", "local-floor", "hand-tracking"])
            .with_frame_limit(3)
            .with_script(Arc::new(|seq| {
                let mut frame = idle_frame(seq);
                frame.input_sources.push(pinching_right_hand());
                frame
            }))
    };

    let h = harness(script(), SimulatedShare::default(), DESKTOP_UA);
    h.features.enter(XrMode::Vr).unwrap();
    h.features.wait_for_session_end();
    assert_eq!(h.share.start_count(), 0);

    let h = harness(script(), SimulatedShare::default(), DESKTOP_UA);
    h.features.initialize();
    assert!(h.features.toggle_hand_tracking());
    h.features.enter(XrMode::Vr).unwrap();
    h.features.wait_for_session_end();

    // Held for three frames: start, stop, start.
    assert_eq!((h.share.start_count(), h.share.stop_count()), (2, 1));
    assert!(h.share.is_sharing());
    assert!(h.features.hand_tracking_enabled());
}

#[test]
fn screen_follows_viewer_while_active() {
    let h = harness(
        SimulatedRuntime::new().with_fps(120.0),
        SimulatedShare::default().sharing(),
        DESKTOP_UA,
    );

    h.features.enter(XrMode::Vr).unwrap();
    h.features.start_metrics();
    wait_until(|| {
        h.features
            .virtual_screen()
            .is_some_and(|screen| screen.position == Vec3::new(0.0, 1.6, -2.5))
    });
    assert_eq!(h.features.controller_count(), 1);
    assert!(h.features.enter(XrMode::Vr).is_err());

    wait_until(|| h.features.metrics().frames >= 3);
    assert!(h.features.exit());
    assert_eq!(h.features.session_state(), SessionState::Idle);
    assert!(!h.features.exit());
}

#[test]
fn passthrough_toggles_only_during_session_on_meta() {
    let h = harness(SimulatedRuntime::new().with_fps(120.0), SimulatedShare::default(), QUEST_UA);
    h.features.initialize();

    assert!(!h.features.toggle_passthrough());
    h.features.enter(XrMode::Vr).unwrap();
    assert!(h.features.toggle_passthrough());
    assert!(!h.features.toggle_passthrough());
    h.features.exit();
    assert!(h.notifier.alerts.lock().unwrap().is_empty());

    let h = harness(SimulatedRuntime::new(), SimulatedShare::default(), DESKTOP_UA);
    h.features.initialize();
    assert!(!h.features.toggle_passthrough());
    assert_eq!(h.notifier.alerts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cleanup_persists_headsets_and_closes_everything() {
    let h = harness(
        SimulatedRuntime::new().with_fps(120.0),
        SimulatedShare::default().sharing(),
        DESKTOP_UA,
    );
    h.controls.apply(&SessionSettings {
        quality: "ultra".into(),
        resolution: "2560x1440".into(),
        auto_quality: false,
        low_latency: true,
    });

    let connected = h
        .features
        .connect_multiple_headsets(&[entry("quest-b"), entry("quest-a")])
        .await;
    assert_eq!(connected, vec!["quest-b", "quest-a"]);
    h.features.enter(XrMode::Vr).unwrap();

    let saved = h.features.cleanup().await;

    assert_eq!(saved.connected_headsets, vec!["quest-a", "quest-b"]);
    assert_eq!(h.features.session_state(), SessionState::Idle);
    assert!(h.features.coordinator().is_empty().await);
    assert!(h.peers.peers().iter().all(|peer| peer.is_closed()));
    assert_eq!(h.peers.peers()[0].tracks().len(), 2);

    let text = h.store.get(SESSION_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["connectedHeadsets"], serde_json::json!(["quest-a", "quest-b"]));
    assert_eq!(value["settings"]["quality"], "ultra");
    assert_eq!(value["settings"]["lowLatency"], true);
}

#[test]
fn cleanup_ends_a_session_stuck_waiting_for_frames() {
    let runtime = Arc::new(SimulatedRuntime::new().with_stalled_frames());
    let h = harness_on(runtime.clone(), SimulatedShare::default(), DESKTOP_UA);
    h.features.enter(XrMode::Vr).unwrap();

    let features = h.features.clone();
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        done_tx.send(rt.block_on(features.cleanup())).unwrap();
    });

    let saved = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("cleanup did not finish");
    assert!(saved.connected_headsets.is_empty());
    assert_eq!(h.features.session_state(), SessionState::Idle);
    assert_eq!(runtime.sessions_ended(), 1);
    assert_eq!(*h.notifier.sessions.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn caster_restores_on_construction_and_saves_on_shutdown() {
    let h = harness(SimulatedRuntime::new(), SimulatedShare::default(), DESKTOP_UA);
    h.store
        .set(
            SESSION_KEY,
            r#"{"settings":{"quality":"low","resolution":"1280x720","autoQuality":false,"lowLatency":true},"connectedHeadsets":["old"],"timestamp":1700000000000}"#,
        )
        .unwrap();

    let base = Arc::new(BaseVrEntry::new(Arc::new(SimulatedRuntime::new())));
    let caster = ExtendedCaster::new(h.features.clone(), base);
    assert_eq!(h.controls.settings().quality, "low");
    assert_eq!(h.controls.settings().resolution, "1280x720");

    let saved = caster.shutdown().await;
    assert!(saved.connected_headsets.is_empty());
    assert_eq!(saved.settings.unwrap().quality, "low");
}

#[test]
fn caster_enters_through_enhanced_path() {
    let h = harness(SimulatedRuntime::new().with_fps(120.0), SimulatedShare::default(), DESKTOP_UA);
    let base_runtime = Arc::new(SimulatedRuntime::new());
    let caster = ExtendedCaster::new(
        h.features.clone(),
        Arc::new(BaseVrEntry::new(base_runtime.clone())),
    );

    assert_eq!(caster.enter_vr().unwrap(), EntryPath::Enhanced);
    assert!(h.features.is_session_active());
    assert_eq!(base_runtime.sessions_requested(), 0);
    h.features.exit();
}

#[test]
fn caster_falls_back_to_base_entry() {
    let h = harness(
        SimulatedRuntime::new().refusing_sessions(),
        SimulatedShare::default(),
        DESKTOP_UA,
    );
    let base_runtime = Arc::new(SimulatedRuntime::new().with_frame_limit(2));
    let caster = ExtendedCaster::new(
        h.features.clone(),
        Arc::new(BaseVrEntry::new(base_runtime.clone())),
    );

    assert_eq!(caster.enter_vr().unwrap(), EntryPath::Base);
    assert!(!h.features.is_session_active());
    assert_eq!(base_runtime.sessions_requested(), 1);
    wait_until(|| base_runtime.sessions_ended() == 1);
}

#[test]
fn caster_reports_when_both_paths_fail() {
    let h = harness(
        SimulatedRuntime::new().refusing_sessions(),
        SimulatedShare::default(),
        DESKTOP_UA,
    );
    let caster = ExtendedCaster::new(
        h.features.clone(),
        Arc::new(BaseVrEntry::new(Arc::new(SimulatedRuntime::new().unavailable()))),
    );
    assert!(caster.enter_vr().is_err());
}

fn session_active<T>(result: Result<T, ClientError>) -> bool {
    matches!(result, Err(ClientError::Xr(XrError::SessionActive)))
}

#[test]
fn caster_keeps_one_session_when_both_paths_share_a_runtime() {
    let runtime = Arc::new(SimulatedRuntime::new().with_fps(120.0));
    let h = harness_on(runtime.clone(), SimulatedShare::default(), DESKTOP_UA);
    let caster = ExtendedCaster::new(
        h.features.clone(),
        Arc::new(BaseVrEntry::new(runtime.clone())),
    );

    assert_eq!(caster.enter_vr().unwrap(), EntryPath::Enhanced);
    assert!(session_active(caster.enter_vr()));
    assert!(session_active(caster.enter_ar()));
    assert_eq!(runtime.sessions_requested(), 1);

    assert!(h.features.exit());
    assert!(!caster.is_active());
    assert_eq!(runtime.sessions_ended(), runtime.sessions_requested());
}

#[tokio::test]
async fn caster_refuses_entry_while_base_session_runs() {
    let enhanced_runtime = Arc::new(SimulatedRuntime::new().refusing_sessions());
    let h = harness_on(enhanced_runtime.clone(), SimulatedShare::default(), DESKTOP_UA);
    let base_runtime = Arc::new(SimulatedRuntime::new().with_stalled_frames());
    let caster = ExtendedCaster::new(
        h.features.clone(),
        Arc::new(BaseVrEntry::new(base_runtime.clone())),
    );

    assert_eq!(caster.enter_vr().unwrap(), EntryPath::Base);
    assert!(caster.is_active());
    assert!(session_active(caster.enter_vr()));
    assert!(session_active(caster.enter_ar()));
    assert_eq!(enhanced_runtime.sessions_requested(), 1);
    assert_eq!(base_runtime.sessions_requested(), 1);

    caster.shutdown().await;
    assert!(!caster.is_active());
    assert_eq!(base_runtime.sessions_ended(), 1);
}
