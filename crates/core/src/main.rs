use std::sync::Arc;
use std::time::Duration;

use charge_core::config::{ChargeCfg, ConfigError, EventSource};
use charge_core::dispatch::PlugDispatcher;
use charge_core::environment::{stdin, sysfs::SysfsPoller};
use charge_core::io::output::{self, ChannelPresence, OutputReceiver, PresenceUpdate};
use charge_core::io::input;
use charge_core::runtime::{MonitorSession, ShutdownGuard};
use charge_sheets::sink::RowAppender;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How long to let in-flight appends finish after the session ends.
const DISPATCH_SETTLE_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
        .init();

    // Configuration errors abort before any session exists.
    let cfg = ChargeCfg::from_env()?;
    let thresholds = cfg.thresholds()?;
    let client = charge_sheets::http::from_env()
        .ok_or(ConfigError::MissingCredentials)?
        .with_range(cfg.sheet_range.clone());
    let appender: Arc<dyn RowAppender> = Arc::new(client);

    let shutdown = ShutdownGuard::new();
    shutdown.spawn_signal_listener();

    let (presence_tx, presence_rx) = output::channel(cfg.presence_buffer);
    let renderer = tokio::spawn(render_presence(presence_rx));

    let dispatcher = PlugDispatcher::new(appender, cfg.sheet_targets());
    let mut session = MonitorSession::with_token(
        thresholds,
        dispatcher,
        ChannelPresence::new(presence_tx),
        shutdown.session_token(),
    );

    let (event_tx, event_rx) = input::channel(cfg.event_buffer);
    let source_token = session.token();
    let source = match cfg.source {
        EventSource::Stdin => {
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            tokio::spawn(async move {
                stdin::forward_lines(reader, event_tx, source_token).await;
            })
        }
        EventSource::Sysfs => {
            let poller =
                SysfsPoller::new(&cfg.battery_path, Duration::from_millis(cfg.poll_interval_ms));
            tokio::spawn(poller.run(event_tx, source_token))
        }
    };

    let session_id = session.id();
    tracing::info!(session = %session_id, source = ?cfg.source, "monitor session starting");
    let end = session.run(event_rx).await;
    tracing::info!(session = %session_id, ?end, "session finished");

    if !session
        .dispatcher()
        .settle(Duration::from_secs(DISPATCH_SETTLE_SECS))
        .await
    {
        tracing::warn!(
            session = %session_id,
            timeout_secs = DISPATCH_SETTLE_SECS,
            "exiting with dispatch still in flight"
        );
    }

    // stdin reads are not cancellable mid-line; don't wait on the source.
    source.abort();
    drop(session);
    let _ = renderer.await;
    Ok(())
}

async fn render_presence(mut rx: OutputReceiver) {
    while let Some(update) = rx.recv().await {
        match update {
            PresenceUpdate::Show(msg) => {
                println!("[{}] {} ({})", msg.target, msg.title, msg.detail);
            }
            PresenceUpdate::Remove => println!("[presence] cleared"),
        }
    }
}
