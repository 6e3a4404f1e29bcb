//! The TCP front door: accept connections, run the handshake, and feed the
//! dispatcher's event queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use feedbus_messages::{Message, ADMIN_FEED, HEARTBEAT_TOPIC};

use crate::config::DistributorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::DistributorError;
use crate::events::InteractorEvent;
use crate::interactors::{Interactor, StreamSecurity};
use crate::roles::DistributorRole;

/// A running distributor.
///
/// [`Server::start`] binds the listener and spawns the accept, dispatch and
/// heartbeat tasks. Dropping the handle leaves them running; call
/// [`Server::shutdown`] to stop them and drop every connection.
pub struct Server {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    pub async fn start(
        config: DistributorConfig,
        security: Arc<dyn StreamSecurity>,
    ) -> Result<Self, DistributorError> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| DistributorError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let policy = Arc::new(config.to_distributor_role());
        let (dispatcher, event_rx) = Dispatcher::new(Arc::clone(&policy), config.advertise_interactors);
        let event_tx = dispatcher.event_tx();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            addr = %local_addr,
            advertise = config.advertise_interactors,
            authorized_feeds = policy.feeds().count(),
            "distributor listening",
        );

        tokio::spawn(dispatcher.run(event_rx, shutdown_rx.clone()));
        if let Some(period) = config.heartbeat_interval() {
            tokio::spawn(heartbeat_loop(period, event_tx.clone(), shutdown_rx.clone()));
        }
        tokio::spawn(accept_loop(
            listener,
            security,
            policy,
            config.write_queue_capacity,
            event_tx,
            shutdown_rx,
        ));

        Ok(Self {
            local_addr,
            shutdown_tx,
        })
    }

    /// The bound address, useful when the configured port was 0.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close every connection and end the event loop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn accept_loop(
    listener: TcpListener,
    security: Arc<dyn StreamSecurity>,
    policy: Arc<DistributorRole>,
    write_queue_capacity: usize,
    event_tx: mpsc::UnboundedSender<InteractorEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(error) => {
                    warn!(%error, "accept failed");
                    continue;
                }
            },
        };

        // The handshake runs off the accept path so a stalled peer cannot
        // hold up new connections.
        let security = Arc::clone(&security);
        let policy = Arc::clone(&policy);
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            match security.secure_inbound(stream, peer).await {
                Ok((stream, user)) => {
                    let interactor =
                        Interactor::attach(stream, peer.ip(), user, policy, write_queue_capacity);
                    debug!(interactor = %interactor, "connection accepted");
                    let _ = event_tx.send(InteractorEvent::Connected(interactor));
                }
                Err(error) => warn!(%peer, %error, "handshake failed"),
            }
        });
    }
}

async fn heartbeat_loop(
    period: Duration,
    event_tx: mpsc::UnboundedSender<InteractorEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the first beat should come one
    // full period in.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {}
        }
        let beat = InteractorEvent::Message {
            source: None,
            message: Message::MulticastData {
                feed: ADMIN_FEED.to_string(),
                topic: HEARTBEAT_TOPIC.to_string(),
                is_image: true,
                data: None,
            },
        };
        if event_tx.send(beat).is_err() {
            break;
        }
    }
}
