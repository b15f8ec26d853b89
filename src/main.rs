use aleph_feeder::app::{App, Config};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let path = Config::path();
    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("aleph-feeder starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut app = tokio::spawn(App::run_with_shutdown(config, shutdown_rx));

    tokio::select! {
        result = &mut app => {
            // Startup failure or idle exit before any signal.
            exit_on_app_result(result);
            return;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    // Let adapters unwind and tasks join before exiting.
    exit_on_app_result(app.await);
    info!("aleph-feeder stopped");
}

fn exit_on_app_result(result: Result<aleph_feeder::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "fatal error");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "feeder task failed");
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
