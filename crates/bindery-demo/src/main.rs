use std::process::ExitCode;
use std::sync::Arc;

use bindery_demo::{DemoConfig, DemoError, LogDialog, run, scripted_session};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = match DemoConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("bindery-demo: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = init_tracing(&config.log_filter) {
        eprintln!("bindery-demo: {err}");
        return ExitCode::from(2);
    }

    match run(&config, Arc::new(LogDialog), scripted_session()) {
        Ok(report) => {
            tracing::info!(
                steps = report.outcomes.len(),
                accepted = report.accepted(),
                final_message = %report.final_message,
                "session finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "session failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(directive: &str) -> Result<(), DemoError> {
    let filter = EnvFilter::try_new(directive).map_err(|source| DemoError::LogFilter {
        directive: directive.to_string(),
        source,
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
    Ok(())
}
