//! The client adapter: one connection, control calls in, events out.

use std::net::{IpAddr, SocketAddr};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};
use uuid::Uuid;

use feedbus_messages::{DataPacket, Message, MessageError, ADMIN_FEED, HEARTBEAT_TOPIC};

use crate::error::ClientError;

/// Connection options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientConfig {
    /// Subscribe to the distributor's heartbeat topic at connect, so the
    /// event stream carries [`ClientEvent::Heartbeat`] while the
    /// connection is healthy.
    pub monitor_heartbeat: bool,
}

/// Where a connection stands. Terminal states end the event stream.
#[derive(Debug)]
pub enum ConnectionState {
    Connected,
    /// The distributor closed the connection on a message boundary.
    Closed,
    /// The connection broke mid-message or the peer violated the protocol.
    Faulted(MessageError),
}

/// Everything the distributor can tell this client.
#[derive(Debug)]
pub enum ClientEvent {
    /// Forwarded multicast or unicast data.
    Data {
        user: String,
        address: IpAddr,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    },
    /// Subscription churn on a feed this client asked to be notified about.
    ForwardedSubscription {
        user: String,
        address: IpAddr,
        client_id: Uuid,
        feed: String,
        topic: String,
        is_add: bool,
    },
    /// A pending subscription awaiting this client's verdict.
    AuthorizationRequest {
        client_id: Uuid,
        address: IpAddr,
        user: String,
        feed: String,
        topic: String,
    },
    /// Another interactor joined or left. Sent only by distributors
    /// configured to advertise.
    Advertisement {
        user: String,
        address: IpAddr,
        is_joining: bool,
    },
    Heartbeat,
    ConnectionChanged(ConnectionState),
}

/// The client's half of the event channel.
pub type ClientEventStream = UnboundedReceiverStream<ClientEvent>;

/// A connection to a distributor.
///
/// Control calls enqueue onto the write loop and never block. Inbound
/// traffic arrives on the [`ClientEventStream`] returned by
/// [`Client::connect`]. Dropping the client closes the connection.
pub struct Client {
    write_tx: mpsc::UnboundedSender<Message>,
    close_tx: watch::Sender<bool>,
}

impl Client {
    /// Connect over TCP.
    pub async fn connect(
        addr: SocketAddr,
        config: ClientConfig,
    ) -> Result<(Client, ClientEventStream), ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect { addr, source })?;
        Client::attach(stream, config)
    }

    /// Run the adapter over an already-established stream. This is how a
    /// transport-secured connection is wrapped.
    pub fn attach<S>(
        stream: S,
        config: ClientConfig,
    ) -> Result<(Client, ClientEventStream), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);

        let _ = event_tx.send(ClientEvent::ConnectionChanged(ConnectionState::Connected));
        tokio::spawn(read_loop(reader, event_tx.clone(), close_rx.clone()));
        tokio::spawn(write_loop(writer, write_rx, event_tx, close_rx));

        let client = Client { write_tx, close_tx };
        if config.monitor_heartbeat {
            client.add_subscription(ADMIN_FEED, HEARTBEAT_TOPIC)?;
        }
        Ok((client, UnboundedReceiverStream::new(event_rx)))
    }

    pub fn add_subscription(
        &self,
        feed: impl Into<String>,
        topic: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.enqueue(Message::SubscriptionRequest {
            feed: feed.into(),
            topic: topic.into(),
            is_add: true,
        })
    }

    pub fn remove_subscription(
        &self,
        feed: impl Into<String>,
        topic: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.enqueue(Message::SubscriptionRequest {
            feed: feed.into(),
            topic: topic.into(),
            is_add: false,
        })
    }

    /// Receive every topic published on a feed without naming them.
    pub fn add_monitor(&self, feed: impl Into<String>) -> Result<(), ClientError> {
        self.enqueue(Message::MonitorRequest {
            feed: feed.into(),
            is_add: true,
        })
    }

    pub fn remove_monitor(&self, feed: impl Into<String>) -> Result<(), ClientError> {
        self.enqueue(Message::MonitorRequest {
            feed: feed.into(),
            is_add: false,
        })
    }

    /// Ask to hear about subscription churn on a feed.
    pub fn add_notification(&self, feed: impl Into<String>) -> Result<(), ClientError> {
        self.enqueue(Message::NotificationRequest {
            feed: feed.into(),
            is_add: true,
        })
    }

    pub fn remove_notification(&self, feed: impl Into<String>) -> Result<(), ClientError> {
        self.enqueue(Message::NotificationRequest {
            feed: feed.into(),
            is_add: false,
        })
    }

    /// Publish to every subscriber of the topic.
    pub fn publish(
        &self,
        feed: impl Into<String>,
        topic: impl Into<String>,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    ) -> Result<(), ClientError> {
        self.enqueue(Message::MulticastData {
            feed: feed.into(),
            topic: topic.into(),
            is_image,
            data,
        })
    }

    /// Publish to one subscriber, addressed by the client id a
    /// [`ClientEvent::ForwardedSubscription`] carried.
    pub fn send(
        &self,
        client_id: Uuid,
        feed: impl Into<String>,
        topic: impl Into<String>,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    ) -> Result<(), ClientError> {
        self.enqueue(Message::UnicastData {
            client_id,
            feed: feed.into(),
            topic: topic.into(),
            is_image,
            data,
        })
    }

    /// Answer a [`ClientEvent::AuthorizationRequest`].
    pub fn authorize(
        &self,
        client_id: Uuid,
        feed: impl Into<String>,
        topic: impl Into<String>,
        is_authorization_required: bool,
        entitlements: Option<Vec<Uuid>>,
    ) -> Result<(), ClientError> {
        self.enqueue(Message::AuthorizationResponse {
            client_id,
            feed: feed.into(),
            topic: topic.into(),
            is_authorization_required,
            entitlements,
        })
    }

    /// Stop both socket loops and drop the connection.
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }

    fn enqueue(&self, message: Message) -> Result<(), ClientError> {
        self.write_tx.send(message).map_err(|_| ClientError::Closed)
    }
}

fn disconnect_state(error: MessageError) -> ConnectionState {
    if error.is_end_of_stream() {
        ConnectionState::Closed
    } else {
        ConnectionState::Faulted(error)
    }
}

async fn read_loop<R>(
    mut reader: R,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    mut close_rx: watch::Receiver<bool>,
) where
    R: AsyncRead + Unpin + Send,
{
    loop {
        let message = tokio::select! {
            _ = close_rx.changed() => break,
            read = Message::read(&mut reader) => match read {
                Ok(message) => message,
                Err(error) => {
                    let _ = event_tx.send(ClientEvent::ConnectionChanged(disconnect_state(error)));
                    break;
                }
            },
        };
        trace!(kind = ?message.kind(), "received");

        let event = match message {
            Message::ForwardedMulticastData {
                user,
                address,
                feed,
                topic,
                is_image,
                data,
            } => {
                if feed == ADMIN_FEED && topic == HEARTBEAT_TOPIC {
                    ClientEvent::Heartbeat
                } else {
                    ClientEvent::Data {
                        user,
                        address,
                        feed,
                        topic,
                        is_image,
                        data,
                    }
                }
            }
            Message::ForwardedUnicastData {
                user,
                address,
                feed,
                topic,
                is_image,
                data,
                ..
            } => ClientEvent::Data {
                user,
                address,
                feed,
                topic,
                is_image,
                data,
            },
            Message::ForwardedSubscriptionRequest {
                user,
                address,
                client_id,
                feed,
                topic,
                is_add,
            } => ClientEvent::ForwardedSubscription {
                user,
                address,
                client_id,
                feed,
                topic,
                is_add,
            },
            Message::AuthorizationRequest {
                client_id,
                address,
                user,
                feed,
                topic,
            } => ClientEvent::AuthorizationRequest {
                client_id,
                address,
                user,
                feed,
                topic,
            },
            Message::InteractorAdvertisement {
                user,
                address,
                is_joining,
            } => ClientEvent::Advertisement {
                user,
                address,
                is_joining,
            },
            message => {
                // Only the distributor-to-client half of the protocol is
                // valid on this side.
                debug!(kind = ?message.kind(), "protocol violation");
                let error = MessageError::Malformed("unexpected client-bound message");
                let _ = event_tx.send(ClientEvent::ConnectionChanged(ConnectionState::Faulted(error)));
                break;
            }
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

async fn write_loop<W>(
    writer: W,
    mut write_rx: mpsc::UnboundedReceiver<Message>,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    mut close_rx: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin + Send,
{
    let mut writer = BufWriter::new(writer);
    loop {
        let message = tokio::select! {
            _ = close_rx.changed() => break,
            maybe_message = write_rx.recv() => {
                let Some(message) = maybe_message else { break };
                message
            }
        };
        trace!(kind = ?message.kind(), "sending");
        if let Err(error) = write_one(&mut writer, &message).await {
            let _ = event_tx.send(ClientEvent::ConnectionChanged(disconnect_state(error)));
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn write_one<W>(writer: &mut BufWriter<W>, message: &Message) -> Result<(), MessageError>
where
    W: AsyncWrite + Unpin + Send,
{
    message.write(writer).await?;
    writer.flush().await?;
    Ok(())
}
