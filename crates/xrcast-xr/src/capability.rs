//! XR capability probing.
//!
//! Every known feature is checked independently; a failing check only marks
//! that one feature unsupported.

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    passthrough::is_meta_device, runtime::XrRuntime, status::set_capability_summary, XrMode,
};

pub const KNOWN_FEATURES: [&str; 7] = [
    "immersive-vr",
    "immersive-ar",
    "hand-tracking",
    "local-floor",
    "bounded-floor",
    "unbounded",
    "layers",
];

/// Feature name to support flag, in [`KNOWN_FEATURES`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityReport {
    features: Vec<(&'static str, bool)>,
}

impl CapabilityReport {
    /// A report with every feature unsupported.
    pub fn unsupported() -> Self {
        Self {
            features: KNOWN_FEATURES.iter().map(|f| (*f, false)).collect(),
        }
    }

    pub fn supports(&self, feature: &str) -> bool {
        self.features
            .iter()
            .any(|(name, supported)| *name == feature && *supported)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.features.iter().copied()
    }

    /// Human-readable list of the headline features for the status line.
    pub fn summary(&self) -> String {
        let labels = [
            ("immersive-vr", "VR"),
            ("immersive-ar", "AR"),
            ("hand-tracking", "Hand Tracking"),
            ("layers", "Layers"),
        ];
        let supported: Vec<&str> = labels
            .iter()
            .filter(|(feature, _)| self.supports(feature))
            .map(|(_, label)| *label)
            .collect();
        if supported.is_empty() {
            "Features: basic only".to_string()
        } else {
            format!("Features: {}", supported.join(", "))
        }
    }

    /// Which optional controls should be offered to the user.
    pub fn affordances(&self, user_agent: &str) -> Affordances {
        Affordances {
            ar_button: self.supports("immersive-ar"),
            hand_tracking_button: self.supports("hand-tracking"),
            passthrough_toggle: is_meta_device(user_agent),
        }
    }
}

impl Serialize for CapabilityReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.features.len()))?;
        for (name, supported) in &self.features {
            map.serialize_entry(name, supported)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Affordances {
    pub ar_button: bool,
    pub hand_tracking_button: bool,
    pub passthrough_toggle: bool,
}

/// Probe the runtime for every known feature and refresh the status line.
pub fn probe(runtime: &dyn XrRuntime) -> CapabilityReport {
    if !runtime.is_available() {
        info!("XR runtime not available");
        set_capability_summary("XR unavailable");
        return CapabilityReport::unsupported();
    }

    let features = KNOWN_FEATURES
        .iter()
        .map(|feature| (*feature, check_feature(runtime, feature)))
        .collect();
    let report = CapabilityReport { features };

    info!(features = ?report.features, "XR capabilities probed");
    set_capability_summary(report.summary());
    report
}

fn check_feature(runtime: &dyn XrRuntime, feature: &str) -> bool {
    let result = match feature {
        "immersive-vr" => runtime.is_session_supported(XrMode::Vr, &[]),
        "immersive-ar" => runtime.is_session_supported(XrMode::Ar, &[]),
        _ => runtime.is_session_supported(XrMode::Vr, &[feature]),
    };
    match result {
        Ok(supported) => supported,
        Err(err) => {
            debug!("capability check for {} failed: {}", feature, err);
            false
        }
    }
}
