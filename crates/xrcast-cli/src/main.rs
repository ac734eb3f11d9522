//! xrcast CLI tools: capability probing, simulated sessions, saved session inspection.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use xrcast_client::{
    BaseVrEntry, CasterConfig, Collaborators, EnhancedFeatures, ExtendedCaster, FileStore,
    LogNotifier, MemoryStore, PersistedSession, ScreenShare, SessionStore, SettingsForm,
    ShareStream, SimulatedShare, SESSION_KEY,
};
use xrcast_common::HostMessage;
use xrcast_web::{LocalSignaling, LoopbackPeerFactory, MultiPeerCoordinator, PeerConfig};
use xrcast_xr::dummy::{idle_frame, SimulatedRuntime};
use xrcast_xr::{probe, xr_status, GamepadButton, XrRuntime};

#[derive(Parser, Debug)]
#[command(name = "xrcast")]
#[command(about = "xrcast CLI tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe a simulated XR runtime and print its capability report
    Probe {
        /// Features the simulated runtime supports
        #[arg(long, value_delimiter = ',', default_value = "immersive-vr,local-floor")]
        features: Vec<String>,

        /// Simulate a device without any XR runtime
        #[arg(long)]
        unavailable: bool,

        /// User agent used for device detection
        #[arg(long, env = "XRCAST_USER_AGENT", default_value = "xrcast")]
        user_agent: String,
    },

    /// Run a simulated immersive session with loopback headsets
    Simulate(SimulateArgs),

    /// Inspect persisted session state
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args, Debug)]
struct SimulateArgs {
    /// Number of frames before the runtime ends the session
    #[arg(long, default_value_t = 216)]
    frames: u64,

    /// Simulated display refresh rate (0 = unpaced)
    #[arg(long, default_value_t = 72.0)]
    fps: f64,

    /// Enter immersive AR instead of VR
    #[arg(long)]
    ar: bool,

    /// Advertise and enable hand tracking
    #[arg(long)]
    hand_tracking: bool,

    /// Start with the screen already shared
    #[arg(long)]
    share: bool,

    /// Press the controller trigger on this frame
    #[arg(long)]
    press_trigger_at: Option<u64>,

    /// Secondary headset ids to announce
    #[arg(long = "headset")]
    headsets: Vec<String>,

    /// Raw host messages (JSON) to deliver on the message port
    #[arg(long = "message")]
    messages: Vec<String>,

    /// Directory for persisted session files (defaults to XRCAST_STORE_DIR, else in-memory)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// User agent used for device detection (defaults to XRCAST_USER_AGENT)
    #[arg(long)]
    user_agent: Option<String>,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Print the saved session snapshot
    Show {
        /// Directory holding persisted session files
        #[arg(long, env = "XRCAST_STORE_DIR")]
        store_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    xrcast_common::init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Probe {
            features,
            unavailable,
            user_agent,
        } => {
            let features: Vec<&str> = features.iter().map(String::as_str).collect();
            let mut runtime = SimulatedRuntime::new().with_features(&features);
            if unavailable {
                runtime = runtime.unavailable();
            }

            let report = probe(&runtime);
            for (feature, supported) in report.iter() {
                println!("{:<14} {}", feature, if supported { "yes" } else { "no" });
            }
            println!("{}", report.summary());
            println!(
                "Affordances: {}",
                serde_json::to_string(&report.affordances(&user_agent))?
            );
            println!("Status: {}", xr_status());
        }
        Command::Simulate(sim) => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(simulate(sim))?;
        }
        Command::Session {
            command: SessionCommand::Show { store_dir },
        } => {
            let store = FileStore::new(&store_dir);
            let Some(text) = store.get(SESSION_KEY)? else {
                println!("No saved session in {}", store_dir.display());
                return Ok(());
            };
            let session: PersistedSession =
                serde_json::from_str(&text).context("saved session is malformed")?;
            if let Some(saved_at) = session.saved_at() {
                println!("Saved at: {}", saved_at.to_rfc3339());
            }
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::Version => {
            println!("xrcast {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn simulated_runtime(sim: &SimulateArgs) -> SimulatedRuntime {
    let mut features = vec!["immersive-vr", "local-floor"];
    if sim.ar {
        features.push("immersive-ar");
    }
    if sim.hand_tracking {
        features.push("hand-tracking");
    }

    let press_at = sim.press_trigger_at;
    SimulatedRuntime::new()
        .with_features(&features)
        .with_frame_limit(sim.frames)
        .with_fps(sim.fps)
        .with_script(Arc::new(move |seq| {
            let mut frame = idle_frame(seq);
            if press_at == Some(seq) {
                for source in &mut frame.input_sources {
                    if let Some(button) = source
                        .gamepad
                        .as_mut()
                        .and_then(|gamepad| gamepad.buttons.first_mut())
                    {
                        *button = GamepadButton {
                            pressed: true,
                            value: 1.0,
                        };
                    }
                }
            }
            frame
        }))
}

async fn simulate(sim: SimulateArgs) -> Result<()> {
    let mut config = CasterConfig::from_env();
    if let Some(dir) = &sim.store_dir {
        config.store_dir = Some(dir.clone());
    }
    if let Some(user_agent) = &sim.user_agent {
        config.user_agent = user_agent.clone();
    }

    let runtime: Arc<dyn XrRuntime> = Arc::new(simulated_runtime(&sim));
    let share = Arc::new(if sim.share {
        SimulatedShare::new(true).sharing()
    } else {
        SimulatedShare::new(true)
    });
    let store: Arc<dyn SessionStore> = match config.file_store() {
        Some(store) => Arc::new(store),
        None => Arc::new(MemoryStore::new()),
    };

    let (signaling, mut outbound) = LocalSignaling::new();
    let coordinator = Arc::new(MultiPeerCoordinator::new(
        PeerConfig::from_env()?,
        Arc::new(LoopbackPeerFactory::new()),
        Arc::new(signaling),
        Arc::new(ShareStream::new(share.clone())),
    ));
    let features = Arc::new(EnhancedFeatures::new(
        runtime.clone(),
        coordinator,
        Collaborators {
            share: share.clone(),
            notifier: Arc::new(LogNotifier),
            store,
            controls: Arc::new(SettingsForm::default()),
        },
        config.user_agent.clone(),
    ));
    let caster = ExtendedCaster::new(features.clone(), Arc::new(BaseVrEntry::new(runtime)));

    let report = features.initialize();
    println!("{}", report.summary());
    if sim.hand_tracking && !features.toggle_hand_tracking() {
        return Err(anyhow!("hand tracking could not be enabled"));
    }

    let (port_tx, port) = mpsc::channel(16);
    let listener = caster.listen(port);
    for id in &sim.headsets {
        port_tx
            .send(HostMessage::new_headset(id.clone(), format!("local://{id}")))
            .await?;
    }
    for text in &sim.messages {
        let message = HostMessage::decode(text).with_context(|| format!("bad message {text}"))?;
        port_tx.send(message).await?;
    }
    drop(port_tx);
    listener.await?;
    println!("Headsets: {:?}", features.coordinator().device_ids().await);

    if sim.ar {
        caster.enter_ar()?;
        features.start_metrics();
        println!("Entered AR");
    } else {
        let path = caster.enter_vr()?;
        println!("Entered VR ({path:?} entry)");
    }

    let waiting = features.clone();
    tokio::task::spawn_blocking(move || waiting.wait_for_session_end()).await?;
    info!("simulated session finished");

    let metrics = features.metrics();
    println!(
        "Frames: {}  frame time: {:.2} ms  rate: {:.1} fps  dropped: {}",
        metrics.frames, metrics.frame_time_ms, metrics.frame_rate, metrics.dropped_frames
    );
    println!("Sharing: {}", share.is_sharing());

    let mut signals = 0;
    while outbound.try_recv().is_ok() {
        signals += 1;
    }
    println!("Signaling messages sent: {signals}");

    let saved = caster.shutdown().await;
    println!("Saved session: {}", serde_json::to_string(&saved)?);
    println!("Status: {}", xr_status());
    Ok(())
}
