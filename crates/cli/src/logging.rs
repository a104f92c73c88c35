use tracing_subscriber::EnvFilter;

/// Install the stderr log writer. `log` records from the library crates are
/// bridged into the same output.
pub fn init(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("warning: invalid log filter '{filter}' ({e}); using 'info'");
        EnvFilter::new("info")
    });

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
