//! Process-wide tracing/logging setup.

/// Subscriber construction (filter, output format).
pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize tracing for the process using `RUST_LOG` and `LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .map(|raw| LogFormat::parse(&raw))
        .unwrap_or_default();
    subscriber::init(format);
}
