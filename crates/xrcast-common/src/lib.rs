//! What the xrcast crates agree on.
//!
//! [`protocol`] holds the JSON messages crossing process boundaries: the
//! host's `NEW_HEADSET_CONNECTION` announcement and the ICE candidates sent
//! back over signaling; decoding them fails with [`Error`].
//! [`helpers::env_list`] reads list-valued settings such as ICE server URLs.
//! [`init_tracing`] is called once by each binary.

#![forbid(unsafe_code)]

pub mod error;
pub mod helpers;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::*;

/// Install the fmt subscriber. `RUST_LOG` overrides the `info` default.
///
/// A subscriber installed earlier wins; the call is then a no-op.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Like [`init_tracing`] with a different fallback filter.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
