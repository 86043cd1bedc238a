pub mod core;

use std::time::Duration;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::error::LauncherResult;
use crate::core::state::{default_data_dir, LauncherConfig, LauncherSession};
use crate::core::transport::HttpTransport;
use crate::core::web::WebTaskHandler;

/// Headless launcher run: check for updates, list servers with their flags,
/// and fetch any missing game resources.
pub fn run() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cubelauncher_lib=debug")),
        )
        .init();

    info!("CubeLauncher starting...");

    if let Err(e) = run_session() {
        error!("Launcher stopped: {}", e);
    }
}

fn run_session() -> LauncherResult<()> {
    let config = LauncherConfig::load(&default_data_dir());
    if !config.settings_path().exists() {
        if let Err(e) = config.save() {
            warn!("Could not write default settings: {}", e);
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let transport = HttpTransport::new(runtime.handle().clone(), config.max_response_bytes)?;
    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let mut session = LauncherSession::new(config, transport);

    session.check_update();
    session.fetch_servers();
    session.check_resources();
    session.fetch_resources();

    let mut flags_queued = false;
    loop {
        session.tick();

        if !flags_queued && session.fetch_servers.is_completed() {
            session.queue_flags_for_servers();
            flags_queued = true;
        }
        if flags_queued && !session.is_busy() {
            break;
        }
        std::thread::sleep(tick_interval);
    }

    report(&session);
    Ok(())
}

fn report(session: &LauncherSession<HttpTransport>) {
    let stray = session.transport().unclaimed();
    if stray > 0 {
        debug!("{} finished requests were never collected", stray);
    }

    let check = &session.check_update;
    if check.task().success {
        match check.latest_build_time() {
            Some(built) => info!("Latest release {} (dev build {})", check.latest_release, built),
            None => info!("Latest release {}", check.latest_release),
        }
    }

    let servers = &session.fetch_servers;
    for row in 0..servers.num_servers().min(10) {
        if let Some(server) = servers.get(row) {
            info!(
                "[{}] {} ({}/{})",
                server.country, server.name, server.players, server.max_players
            );
        }
    }
    info!("{} flags known", session.flags.len());

    let resources = &session.resources;
    if resources.failed {
        warn!("{}", resources.display_error());
    } else {
        info!(
            "Resources ready ({:.0}% of batch fetched)",
            resources.progress() * 100.0
        );
    }
}
