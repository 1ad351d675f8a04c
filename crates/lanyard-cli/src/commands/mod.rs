//! CLI command implementations.

pub mod check;
pub mod resolve;
pub mod show;
pub mod version;

use lanyard_config::Backends;

/// The CLI has no network clients; every named backend is offline.
pub(crate) fn offline_backends() -> Backends {
    Backends::new().with_offline_fallback()
}
