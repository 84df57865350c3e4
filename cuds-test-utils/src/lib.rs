//! Test helpers shared by the CUDS crates.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
///
/// Honours `RUST_LOG`; defaults to `info`. Use e.g.
/// `RUST_LOG=cuds_table=trace` to see row-level operations.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another harness may already have installed a global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(feature = "auto-init")]
mod auto {
    // Runs at binary init time so individual tests need not call it.
    use ctor::ctor;

    #[ctor]
    fn init() {
        super::init_tracing_for_tests();
    }
}
