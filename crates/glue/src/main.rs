use std::process::ExitCode;
use std::sync::Arc;

use glue_core::{AppOption, Application, Bundle};
use log::debug;

// --- Statically registered bundles ---
use core_logging::LoggingBundle;
use greeter_bundle::GreeterBundle;

fn bundles() -> Vec<Arc<dyn Bundle>> {
    vec![Arc::new(LoggingBundle), Arc::new(GreeterBundle::default())]
}

#[tokio::main]
async fn main() -> ExitCode {
    let app = match Application::new([
        AppOption::version(env!("CARGO_PKG_VERSION")),
        AppOption::bundles(bundles()),
    ]) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.execute().await {
        Ok(()) => {
            debug!("{} finished", app.root_name());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
