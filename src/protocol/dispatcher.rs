//! Vote dispatch: stamp, connect, run the protocol, close, record.

use crate::config::{ClientConfig, TransportConfig};
use crate::core::server::ServerIdentity;
use crate::core::vote::{StampedVote, Vote};
use crate::error::{ProtocolError, Result};
use crate::protocol::Protocol;
use crate::transport::Connection;
use crate::utils::metrics::{self, Metrics, Timer};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, instrument, warn};

/// Sends votes to one server.
///
/// Each send is one connection, one request and (for v2) one response. The
/// connection is closed before the outcome is returned, whatever it is.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    server: ServerIdentity,
    transport: TransportConfig,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(server: ServerIdentity) -> Self {
        Self {
            server,
            transport: TransportConfig::default(),
            metrics: metrics::global(),
        }
    }

    /// Build from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(config.server.identity()?).with_transport(config.transport.clone()))
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn server(&self) -> &ServerIdentity {
        &self.server
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Stamp `vote`, connect, send it, close. Returns the vote as sent.
    #[instrument(skip(self, vote), fields(server = %self.server.address(), protocol = %self.server.protocol()))]
    pub async fn send(&self, vote: &Vote) -> Result<StampedVote> {
        let _timer = Timer::start("send_vote");
        self.metrics.vote_attempt();

        let outcome = self.connect_and_send(vote).await;
        self.record(&outcome);
        outcome
    }

    /// Like [`Dispatcher::send`], over a connection the caller already opened
    #[instrument(skip(self, conn, vote), fields(peer = conn.peer(), protocol = %self.server.protocol()))]
    pub async fn send_over<S>(&self, conn: Connection<S>, vote: &Vote) -> Result<StampedVote>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let _timer = Timer::start("send_vote");
        self.metrics.vote_attempt();

        let outcome = async {
            let protocol = self.prepare()?;
            let stamped = vote.stamp()?;
            self.deliver(conn, &protocol, stamped).await
        }
        .await;
        self.record(&outcome);
        outcome
    }

    /// Blocking variant of [`Dispatcher::send`] for callers without a runtime.
    ///
    /// Must not be called from inside an async context.
    pub fn send_blocking(&self, vote: &Vote) -> Result<StampedVote> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.send(vote))
    }

    fn prepare(&self) -> Result<Protocol> {
        self.server.validate()?;
        let errors = self.transport.validate();
        if !errors.is_empty() {
            return Err(ProtocolError::ConfigError(errors.join("; ")));
        }
        Protocol::for_server(&self.server, &self.transport)
    }

    async fn connect_and_send(&self, vote: &Vote) -> Result<StampedVote> {
        let protocol = self.prepare()?;
        let stamped = vote.stamp()?;
        let conn = Connection::connect(
            self.server.host(),
            self.server.port(),
            self.transport.connect_timeout,
        )
        .await?;
        self.deliver(conn, &protocol, stamped).await
    }

    async fn deliver<S>(
        &self,
        mut conn: Connection<S>,
        protocol: &Protocol,
        stamped: StampedVote,
    ) -> Result<StampedVote>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = protocol.send(&mut conn, &stamped).await;
        self.metrics
            .traffic(conn.bytes_sent(), conn.bytes_received());
        conn.close().await;
        outcome.map(|()| stamped)
    }

    fn record(&self, outcome: &Result<StampedVote>) {
        match outcome {
            Ok(stamped) => {
                self.metrics.vote_success();
                info!(
                    username = stamped.username(),
                    service = stamped.service_name(),
                    "Vote delivered"
                );
            }
            Err(e) => {
                self.metrics.vote_failed(e);
                warn!(error = %e, "Vote not delivered");
            }
        }
    }
}

/// Send one vote to `server` with default transport settings
pub async fn send_vote(vote: &Vote, server: &ServerIdentity) -> Result<StampedVote> {
    Dispatcher::new(server.clone()).send(vote).await
}

/// Blocking [`send_vote`]
pub fn send_vote_blocking(vote: &Vote, server: &ServerIdentity) -> Result<StampedVote> {
    Dispatcher::new(server.clone()).send_blocking(vote)
}
