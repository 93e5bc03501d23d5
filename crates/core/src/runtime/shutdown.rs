use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Process-wide shutdown via CancellationToken.
/// SIGTERM or Ctrl+C cancels the token; sessions hang child tokens off it.
#[derive(Debug)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// The root token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// A token cancelled with the root, but which can also be cancelled on
    /// its own (one per session).
    pub fn session_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Spawn a background task that cancels the root token on SIGTERM/Ctrl+C.
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to register SIGTERM handler");
                            return;
                        }
                    };
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, stopping"),
                    _ = signal::ctrl_c() => tracing::info!("received Ctrl+C, stopping"),
                    _ = token.cancelled() => return,
                }
            }
            #[cfg(not(unix))]
            {
                tokio::select! {
                    _ = signal::ctrl_c() => tracing::info!("received Ctrl+C, stopping"),
                    _ = token.cancelled() => return,
                }
            }
            token.cancel();
        });
    }
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}
