// Relay lifecycle supervisor
//
// Runs the mailbox server as a managed task with a graceful-shutdown signal
// and exposes the start/stop/is_running contract the caller reflects in its
// UI. A single caller is assumed to serialize start and stop.

use parking_lot::Mutex;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::relay::server::{routes, Mailbox};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to bind relay server: {0}")]
    Bind(String),
}

/// Handle to the running server task. Exists only while the server runs;
/// consumed on stop.
struct RelayHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Supervises at most one relay mailbox server.
#[derive(Default)]
pub struct RelaySupervisor {
    handle: Mutex<Option<RelayHandle>>,
}

impl RelaySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the mailbox server and spawn its serve task. Idempotent: when a
    /// handle is already held this is a no-op returning the existing bound
    /// address. The mailbox starts empty on every fresh start.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, config: &RelayConfig) -> Result<SocketAddr, SupervisorError> {
        let mut handle = self.handle.lock();
        if let Some(existing) = handle.as_ref() {
            return Ok(existing.addr);
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (addr, serving) = warp::serve(routes(Mailbox::new()))
            .try_bind_with_graceful_shutdown(config.socket_addr(), async move {
                shutdown_rx.await.ok();
            })
            .map_err(|err| SupervisorError::Bind(err.to_string()))?;

        info!("relay mailbox listening on {}", addr);
        let task = tokio::spawn(serving);
        *handle = Some(RelayHandle {
            addr,
            shutdown: shutdown_tx,
            task,
        });
        Ok(addr)
    }

    /// Request graceful termination and wait for the task to exit. No-op
    /// when not running.
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        if let Some(RelayHandle {
            addr,
            shutdown,
            task,
        }) = handle
        {
            // A server that already died on its own has dropped the receiver.
            let _ = shutdown.send(());
            if let Err(err) = task.await {
                warn!("relay server task ended abnormally: {}", err);
            }
            info!("relay mailbox on {} stopped", addr);
        }
    }

    /// Running flag for the caller's UI. A task that died on its own leaves
    /// a stale handle here until the next explicit `stop`.
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Bound address of the running server, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.lock().as_ref().map(|handle| handle.addr)
    }
}
