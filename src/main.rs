use std::io;

use terminal_chess::cli::Session;
use terminal_chess::config::GameConfig;

fn main() {
    // Logs go to stderr so they never interleave with the board on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terminal_chess=warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = GameConfig::from_env();
    config.apply_args(std::env::args().skip(1));

    tracing::info!(
        "terminal-chess v{} starting ({:?})",
        env!("CARGO_PKG_VERSION"),
        config
    );

    let stdin = io::stdin();
    let mut session = Session::new(config, stdin.lock(), io::stdout());
    if let Err(e) = session.run() {
        tracing::error!("session failed: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
