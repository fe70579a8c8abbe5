use tracing_subscriber::EnvFilter;

pub fn init_subscriber() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init()
        .ok();
}
