use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use github_stars::config::Config;
use github_stars::github::GitHubClient;
use github_stars::notify::{LogNotifier, Notifiers, SlackNotifier};
use github_stars::scanner::{self, Monitor};
use github_stars::server::{AppState, build_router};
use github_stars::store::{NotifyingStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "github_stars=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("reading configuration")?;
    info!(?config, "Starting");

    let store = Store::open_or_reinitialize(&config.directory)
        .with_context(|| format!("opening database in {}", config.directory.display()))?;

    let mut notifiers = Notifiers::new().with(LogNotifier);
    if let Some(url) = &config.slack_webhook {
        notifiers = notifiers
            .with(SlackNotifier::new(url.as_str()).with_maximum_users(config.slack_max_users));
    }
    let store = Arc::new(NotifyingStore::new(store, notifiers));

    let github = match &config.token {
        Some(token) => GitHubClient::from_token(token.as_str()),
        None => {
            warn!("No GITHUB_TOKEN set; using unauthenticated API access");
            GitHubClient::anonymous()
        }
    }
    .context("building GitHub client")?;
    let github = Arc::new(github);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    // An incomplete scan is not fatal: the webhook and the monitor catch up.
    match scanner::scan(
        &config.user,
        &github,
        &store,
        config.include_archived,
        &cancel,
    )
    .await
    {
        Ok(summary) => info!(
            found = summary.found,
            scanned = summary.scanned,
            "Initial scan complete"
        ),
        Err(e) => error!(error = %e, "Initial scan failed"),
    }
    if cancel.is_cancelled() {
        return Ok(());
    }

    let monitor = config.monitor_config().map(|monitor_config| {
        let monitor = Monitor::new(
            config.user.clone(),
            Arc::clone(&github),
            Arc::clone(&store),
            monitor_config,
        );
        tokio::spawn(monitor.run(cancel.child_token()))
    });

    let app = build_router(AppState::new(
        Arc::clone(&store),
        config.webhook_secret.as_bytes(),
    ));
    let listener = tokio::net::TcpListener::bind(config.webhook_addr)
        .await
        .with_context(|| format!("binding {}", config.webhook_addr))?;
    info!(addr = %config.webhook_addr, "Listening for webhooks");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await
        .context("serving webhooks")?;

    cancel.cancel();
    if let Some(monitor) = monitor {
        if let Err(e) = monitor.await {
            error!(error = %e, "Monitor task failed");
        }
    }

    info!("Shut down");
    Ok(())
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = ctrl_c => {
            if let Err(e) = result {
                warn!(error = %e, "Unable to listen for ctrl-c");
                return;
            }
        }
        () = terminate => {}
    }

    info!("Shutdown requested");
    cancel.cancel();
}
