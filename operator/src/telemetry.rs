use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`. Safe to call more than
/// once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
