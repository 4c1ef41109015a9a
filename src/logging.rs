use tracing_subscriber::EnvFilter;

/// Initialize diagnostic logging on stderr.
///
/// Status lines (`[+]`, `[!]`, `[✓]`) go to stdout separately; this only
/// carries `tracing` events, filtered by `RUST_LOG`.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("asset-harvester logging initialized");
}

/// Progress line for something that went right.
pub fn progress(message: impl std::fmt::Display) {
    println!("[+] {}", message);
}

/// A failure the run reports and, depending on the caller, moves past.
pub fn failure(message: impl std::fmt::Display) {
    println!("[!] {}", message);
}

/// A completed remote step.
pub fn done(message: impl std::fmt::Display) {
    println!("[✓] {}", message);
}
