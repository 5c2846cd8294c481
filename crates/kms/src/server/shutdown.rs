//! Serving with a bounded graceful shutdown.
//!
//! The server runs as its own task. A [`CancellationToken`] marks the
//! shutdown request; once it fires the listener stops accepting, in-flight
//! requests get the grace period to finish, and anything still open after
//! that is dropped and reported as an error.

use std::{future::Future, io, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use axum::Router;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Spawn a task that cancels `token` on SIGINT, SIGTERM or SIGHUP.
///
/// If the handlers cannot be installed the token is still cancelled, and the
/// task resolves to the install error.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<io::Result<()>> {
    tokio::spawn(cancel_on(wait_for_signal(), token))
}

/// Wait for `signal`, then cancel `token`.
async fn cancel_on<F>(signal: F, token: CancellationToken) -> io::Result<()>
where
    F: Future<Output = io::Result<&'static str>>,
{
    let outcome = signal.await;
    match &outcome {
        Ok(signal) => info!(signal, "termination signal received"),
        Err(e) => error!(error = %e, "failed to install signal handlers; shutting down"),
    }
    token.cancel();
    outcome.map(drop)
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = hangup.recv() => Ok("SIGHUP"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

/// Serve `router` on `listener` until `shutdown` is cancelled, then drain for
/// at most `grace`.
///
/// # Errors
///
/// Returns an error if the server stops on its own, fails while draining, or
/// does not drain within `grace`.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> Result<()> {
    let stop = shutdown.clone().cancelled_owned();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(stop)
            .await
    });

    // An idle server finishes as soon as the token fires, so both branches
    // can be ready together; the token must win.
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => {}
        joined = &mut server => {
            joined.context("server task panicked")?.context("server error")?;
            if shutdown.is_cancelled() {
                info!("server stopped");
                return Ok(());
            }
            return Err(anyhow!("server stopped before shutdown was requested"));
        }
    }

    info!(grace_secs = grace.as_secs_f64(), "draining in-flight requests");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined
                .context("server task panicked")?
                .context("server error during shutdown")?;
            info!("server stopped");
            Ok(())
        }
        Err(_) => {
            server.abort();
            bail!("in-flight requests did not complete within {grace:?}; closing connections")
        }
    }
}

/// [`serve`], then surface the outcome of the signal task that owns
/// `shutdown`.
///
/// # Errors
///
/// Returns the [`serve`] error if there is one, otherwise an error if the
/// signal handlers could not be installed.
pub async fn serve_until_signalled(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
    signals: JoinHandle<io::Result<()>>,
    grace: Duration,
) -> Result<()> {
    let served = serve(listener, router, shutdown, grace).await;
    if served.is_err() {
        signals.abort();
        return served;
    }
    signals
        .await
        .context("signal task panicked")?
        .context("failed to install signal handlers")
}
