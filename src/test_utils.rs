/// Installs a subscriber that prints through the test harness, once per process.
pub fn init() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .unwrap_or_default();
}
