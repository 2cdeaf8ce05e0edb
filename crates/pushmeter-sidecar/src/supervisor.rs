//! Process supervisor.
//!
//! Responsibilities:
//! - Drive the lifecycle: starting -> running -> shutting-down -> stopped
//! - Run the ticker loop and the HTTP server as independent tasks
//! - Wait for SIGINT/SIGTERM (or a server failure, when configured fatal)
//! - Ordered shutdown: cancel ticker, await it, flush reporter, drop server
//!
//! The HTTP server is not drained; in-flight requests may be cut off.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use pushmeter_core::error::{PushmeterError, Result};
use pushmeter_core::LifecycleState;

use crate::config::SidecarConfig;
use crate::router;
use crate::telemetry::{ErrorSink, MetricReporter, ReporterOptions};
use crate::ticker;

/// What a completed run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reports_fired: u64,
    /// Non-fatal: the final flush failed or ran out of grace period.
    pub shutdown_error: Option<PushmeterError>,
}

pub struct Supervisor {
    cfg: SidecarConfig,
    reporter: Arc<MetricReporter>,
    state: watch::Sender<LifecycleState>,
}

impl Supervisor {
    /// Initialize the OTLP reporter from config.
    /// Returns `Initialization` when the export pipeline cannot be built.
    pub async fn start(cfg: SidecarConfig, errors: Arc<dyn ErrorSink>) -> Result<Self> {
        let opts = ReporterOptions::from_config(&cfg.telemetry);
        match MetricReporter::initialize(&opts, errors).await {
            Ok(reporter) => Ok(Self::with_reporter(cfg, Arc::new(reporter))),
            Err(e) => {
                tracing::error!(code = e.code().as_str(), error = %e, "reporter initialization failed");
                Err(e)
            }
        }
    }

    pub fn with_reporter(cfg: SidecarConfig, reporter: Arc<MetricReporter>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self { cfg, reporter, state }
    }

    /// Follow lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn reporter(&self) -> Arc<MetricReporter> {
        Arc::clone(&self.reporter)
    }

    fn advance(&self, next: LifecycleState) -> Result<()> {
        let current = *self.state.borrow();
        let next = current.advance(next)?;
        self.state.send_replace(next);
        tracing::info!(from = %current, to = %next, "lifecycle transition");
        Ok(())
    }

    /// Bind the configured address and run until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<RunSummary> {
        let bind = bind(self.cfg.server.listen.clone());
        self.run_until(bind, shutdown_signal()).await
    }

    /// Run until `shutdown` resolves.
    ///
    /// `bind` is awaited inside the server task, so a bind failure is handled
    /// like any other server failure: logged, and fatal only when
    /// `server.fail_on_server_error` is set.
    pub async fn run_until<B, S>(self, bind: B, shutdown: S) -> Result<RunSummary>
    where
        B: Future<Output = io::Result<TcpListener>> + Send + 'static,
        S: Future<Output = ()>,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let ticker = tokio::spawn(ticker::run_ticker(
            self.reporter(),
            self.cfg.telemetry.cadence(),
            cancel_rx,
        ));
        let mut server = spawn_server(bind);

        self.advance(LifecycleState::Running)?;
        tracing::info!(
            service = %self.cfg.telemetry.service_name,
            addr = %self.cfg.server.listen,
            "sidecar running"
        );

        let fail_fast = self.cfg.server.fail_on_server_error;
        tokio::pin!(shutdown);
        let server_error = tokio::select! {
            _ = &mut shutdown => None,
            joined = &mut server, if fail_fast => Some(match joined {
                Ok(Ok(())) => PushmeterError::Server("server exited".into()),
                Ok(Err(e)) => e,
                Err(e) => PushmeterError::Server(format!("server task failed: {e}")),
            }),
        };

        self.advance(LifecycleState::ShuttingDown)?;

        cancel_tx.send_replace(true);
        let reports_fired = match ticker.await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "ticker task failed");
                0
            }
        };

        let grace = self.cfg.shutdown.grace_period();
        let shutdown_error = match self.reporter.shutdown(grace).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(code = e.code().as_str(), error = %e, "reporter shutdown incomplete");
                Some(e)
            }
        };

        server.abort();
        self.advance(LifecycleState::Stopped)?;

        match server_error {
            Some(e) => Err(e),
            None => Ok(RunSummary {
                reports_fired,
                shutdown_error,
            }),
        }
    }
}

/// Parse `listen` and bind it. A bad address surfaces as a bind failure.
pub async fn bind(listen: String) -> io::Result<TcpListener> {
    let addr: SocketAddr = listen.parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid listen address {listen:?}: {e}"),
        )
    })?;
    TcpListener::bind(addr).await
}

fn spawn_server<B>(bind: B) -> JoinHandle<Result<()>>
where
    B: Future<Output = io::Result<TcpListener>> + Send + 'static,
{
    tokio::spawn(async move {
        let res = serve(bind).await;
        if let Err(e) = &res {
            tracing::error!(error = %e, "server failed");
        }
        res
    })
}

async fn serve<B>(bind: B) -> Result<()>
where
    B: Future<Output = io::Result<TcpListener>>,
{
    let listener = bind
        .await
        .map_err(|e| PushmeterError::Server(format!("bind failed: {e}")))?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "server started");
    }
    axum::serve(listener, router::build_router())
        .await
        .map_err(|e| PushmeterError::Server(format!("serve failed: {e}")))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
