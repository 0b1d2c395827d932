// File:    dispatcher.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: Accepts connections under a bounded worker budget and reclaims finished workers.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Connection dispatcher.
//!
//! A single event loop owns the worker budget. It waits on three things at
//! once: the shutdown signal, the next finished worker, and (only while the
//! budget has room) the next inbound connection. Finished workers are drained
//! before new connections are taken, so a completion that lands while an
//! accept is pending is seen on the next turn of the loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::{JoinError, JoinSet};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{OtpError, Result};
use crate::frame::FrameCodec;
use crate::session::Session;

/// Pause after a failed `accept` so a persistent error does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Count of in-flight sessions, bounded by a fixed maximum.
///
/// `0 <= active <= max` holds after every call; a call that would break it
/// fails with [`OtpError::ResourceExhaustion`] and leaves the count unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerBudget {
    active: usize,
    max: usize,
}

impl WorkerBudget {
    /// Creates an empty budget allowing `max` concurrent workers.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self { active: 0, max }
    }

    /// Workers currently running.
    #[must_use]
    pub const fn active(&self) -> usize {
        self.active
    }

    /// The configured maximum.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Whether another worker may start.
    #[must_use]
    pub const fn has_capacity(&self) -> bool {
        self.active < self.max
    }

    /// Claims a slot for a new worker.
    ///
    /// # Errors
    ///
    /// Fails if the budget is already saturated.
    pub fn acquire(&mut self) -> Result<()> {
        if !self.has_capacity() {
            return Err(OtpError::ResourceExhaustion(format!(
                "worker budget of {} exceeded",
                self.max
            )));
        }
        self.active += 1;
        Ok(())
    }

    /// Returns the slot of a finished worker.
    ///
    /// # Errors
    ///
    /// Fails if no worker is accounted for.
    pub fn release(&mut self) -> Result<()> {
        self.active = self.active.checked_sub(1).ok_or_else(|| {
            OtpError::ResourceExhaustion("worker count would drop below zero".into())
        })?;
        Ok(())
    }
}

/// Read-only view of the dispatcher's active worker count.
#[derive(Debug, Clone, Default)]
pub struct ActiveWorkers(Arc<AtomicUsize>);

impl ActiveWorkers {
    /// Current number of running sessions.
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

struct SessionOutcome {
    id: Uuid,
    peer: SocketAddr,
    result: Result<usize>,
}

/// Accepts connections and runs one [`Session`] per connection as responder.
pub struct Dispatcher {
    listener: TcpListener,
    config: ServerConfig,
    budget: WorkerBudget,
    workers: JoinSet<SessionOutcome>,
    gauge: ActiveWorkers,
}

impl Dispatcher {
    /// Validates `config` and binds a listener with the configured backlog.
    ///
    /// # Errors
    ///
    /// [`OtpError::InvalidInput`] for a bad config, [`OtpError::Transport`]
    /// if the socket cannot be created, bound or put into listening mode.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr();
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| OtpError::transport("creating listener socket", e))?;
        socket
            .set_reuseaddr(true)
            .map_err(|e| OtpError::transport("configuring listener socket", e))?;
        socket
            .bind(addr)
            .map_err(|e| OtpError::transport("binding listener", e))?;
        let listener = socket
            .listen(config.backlog)
            .map_err(|e| OtpError::transport("listening", e))?;
        Self::from_listener(listener, config)
    }

    /// Wraps an already bound listener. The address fields of `config` are ignored.
    ///
    /// # Errors
    ///
    /// [`OtpError::InvalidInput`] for a bad config.
    pub fn from_listener(listener: TcpListener, config: ServerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            listener,
            budget: WorkerBudget::new(config.max_workers),
            config,
            workers: JoinSet::new(),
            gauge: ActiveWorkers::default(),
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// [`OtpError::Transport`] if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| OtpError::transport("reading listener address", e))
    }

    /// Handle for observing the number of running sessions.
    #[must_use]
    pub fn active_workers(&self) -> ActiveWorkers {
        self.gauge.clone()
    }

    /// Serves connections until the process ends.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::run_until`].
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serves connections until `shutdown` resolves, then waits for the
    /// sessions still running.
    ///
    /// # Errors
    ///
    /// [`OtpError::ResourceExhaustion`] if the budget accounting breaks, or
    /// [`OtpError::Transport`] if the listener address cannot be read at
    /// startup. Session failures are logged and never end the loop.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "{} serving on {} (max {} workers)",
            self.config.role.service_name(),
            self.local_addr()?,
            self.budget.max()
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("shutdown requested; no longer accepting connections");
                    break;
                }
                Some(joined) = self.workers.join_next(), if !self.workers.is_empty() => {
                    self.reclaim(joined)?;
                }
                accepted = self.listener.accept(), if self.budget.has_capacity() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_worker(stream, peer)?,
                        Err(e) => {
                            warn!("accept failed: {e}");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
            }
        }

        while let Some(joined) = self.workers.join_next().await {
            self.reclaim(joined)?;
        }
        info!("all sessions finished");
        Ok(())
    }

    fn spawn_worker(&mut self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        self.budget.acquire()?;
        self.publish();

        let codec = FrameCodec::new(self.config.chunk_size);
        let mut session = Session::new(stream, self.config.role, codec)
            .with_max_payload_len(self.config.max_payload_len);
        let id = session.id();
        info!(
            "[{id}] accepted connection from {peer} ({}/{} workers)",
            self.budget.active(),
            self.budget.max()
        );
        if !self.budget.has_capacity() {
            debug!("worker budget saturated; accept paused");
        }

        self.workers.spawn(async move {
            let result = session.respond().await;
            SessionOutcome { id, peer, result }
        });
        Ok(())
    }

    fn reclaim(&mut self, joined: Result<SessionOutcome, JoinError>) -> Result<()> {
        self.budget.release()?;
        self.publish();

        match joined {
            Ok(SessionOutcome {
                id,
                peer,
                result: Ok(length),
            }) => info!("[{id}] session with {peer} completed ({length} bytes)"),
            Ok(SessionOutcome {
                id,
                peer,
                result: Err(e),
            }) => warn!("[{id}] session with {peer} failed ({}): {e}", e.kind()),
            Err(e) => error!("worker terminated abnormally: {e}"),
        }
        debug!(
            "worker reclaimed ({}/{} workers)",
            self.budget.active(),
            self.budget.max()
        );
        Ok(())
    }

    fn publish(&self) {
        self.gauge.0.store(self.budget.active(), Ordering::Release);
    }
}
