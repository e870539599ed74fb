use stride_probe_core::CoreError;
use tracing_subscriber::EnvFilter;

mod commands;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = commands::probe::run();

    match result {
        Ok(()) => {}
        // Already reported on stdout by the pipeline.
        Err(CoreError::Evaluation(_)) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
