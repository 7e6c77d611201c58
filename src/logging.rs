// 📝 Logging - tracing subscriber setup shared by both binaries

use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins; otherwise the configured level applies to this crate
/// and `warn` to everything else.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,front_desk={default_level}")));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = fmt().with_env_filter(filter).try_init();
}
