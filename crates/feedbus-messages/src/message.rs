//! The tagged message set shared by the distributor and its clients.
//!
//! Every message is one tag byte followed by a kind-specific body. The
//! numbering is part of the wire contract:
//!
//! | tag | kind                         |
//! |-----|------------------------------|
//! | 0   | InteractorAdvertisement      |
//! | 1   | MulticastData                |
//! | 2   | UnicastData                  |
//! | 3   | ForwardedMulticastData       |
//! | 4   | ForwardedUnicastData         |
//! | 5   | ForwardedSubscriptionRequest |
//! | 6   | NotificationRequest          |
//! | 7   | SubscriptionRequest          |
//! | 8   | AuthorizationRequest         |
//! | 9   | AuthorizationResponse        |
//! | 10  | MonitorRequest               |
//!
//! End-of-stream on the tag byte decodes as [`MessageError::EndOfStream`];
//! end-of-stream anywhere later is a fault, as is an unknown tag.

use std::io;
use std::net::IpAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::data_packet::DataPacket;
use crate::error::MessageError;
use crate::io::{MessageReadExt, MessageWriteExt};

/// The message kind tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    InteractorAdvertisement = 0,
    MulticastData = 1,
    UnicastData = 2,
    ForwardedMulticastData = 3,
    ForwardedUnicastData = 4,
    ForwardedSubscriptionRequest = 5,
    NotificationRequest = 6,
    SubscriptionRequest = 7,
    AuthorizationRequest = 8,
    AuthorizationResponse = 9,
    MonitorRequest = 10,
}

impl TryFrom<u8> for MessageKind {
    type Error = MessageError;

    fn try_from(tag: u8) -> Result<Self, MessageError> {
        match tag {
            0 => Ok(MessageKind::InteractorAdvertisement),
            1 => Ok(MessageKind::MulticastData),
            2 => Ok(MessageKind::UnicastData),
            3 => Ok(MessageKind::ForwardedMulticastData),
            4 => Ok(MessageKind::ForwardedUnicastData),
            5 => Ok(MessageKind::ForwardedSubscriptionRequest),
            6 => Ok(MessageKind::NotificationRequest),
            7 => Ok(MessageKind::SubscriptionRequest),
            8 => Ok(MessageKind::AuthorizationRequest),
            9 => Ok(MessageKind::AuthorizationResponse),
            10 => Ok(MessageKind::MonitorRequest),
            tag => Err(MessageError::UnknownMessageType(tag)),
        }
    }
}

/// A wire-protocol message. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Announces an interactor joining or leaving the bus.
    InteractorAdvertisement {
        user: String,
        address: IpAddr,
        is_joining: bool,
    },

    /// Client-originated publish to every subscriber of (feed, topic).
    MulticastData {
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    },

    /// Client-originated publish to a single subscriber identified by id.
    UnicastData {
        client_id: Uuid,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    },

    /// Distributor-originated multicast delivery, stamped with the
    /// publisher's identity.
    ForwardedMulticastData {
        user: String,
        address: IpAddr,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    },

    /// Distributor-originated unicast delivery, stamped with the publisher's
    /// identity.
    ForwardedUnicastData {
        user: String,
        address: IpAddr,
        client_id: Uuid,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    },

    /// Tells a notifiable that `client_id` subscribed to or unsubscribed
    /// from (feed, topic).
    ForwardedSubscriptionRequest {
        user: String,
        address: IpAddr,
        client_id: Uuid,
        feed: String,
        topic: String,
        is_add: bool,
    },

    /// Asks the distributor to start or stop forwarding subscription churn
    /// on a feed.
    NotificationRequest { feed: String, is_add: bool },

    /// Asks the distributor to subscribe or unsubscribe (feed, topic).
    SubscriptionRequest {
        feed: String,
        topic: String,
        is_add: bool,
    },

    /// Distributor-to-authorizer request to entitle `client_id` on
    /// (feed, topic).
    AuthorizationRequest {
        client_id: Uuid,
        address: IpAddr,
        user: String,
        feed: String,
        topic: String,
    },

    /// Authorizer-to-distributor verdict for a pending subscription.
    AuthorizationResponse {
        client_id: Uuid,
        feed: String,
        topic: String,
        is_authorization_required: bool,
        entitlements: Option<Vec<Uuid>>,
    },

    /// Asks the distributor to start or stop feed-level monitoring.
    MonitorRequest { feed: String, is_add: bool },
}

impl Message {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::InteractorAdvertisement { .. } => MessageKind::InteractorAdvertisement,
            Message::MulticastData { .. } => MessageKind::MulticastData,
            Message::UnicastData { .. } => MessageKind::UnicastData,
            Message::ForwardedMulticastData { .. } => MessageKind::ForwardedMulticastData,
            Message::ForwardedUnicastData { .. } => MessageKind::ForwardedUnicastData,
            Message::ForwardedSubscriptionRequest { .. } => {
                MessageKind::ForwardedSubscriptionRequest
            }
            Message::NotificationRequest { .. } => MessageKind::NotificationRequest,
            Message::SubscriptionRequest { .. } => MessageKind::SubscriptionRequest,
            Message::AuthorizationRequest { .. } => MessageKind::AuthorizationRequest,
            Message::AuthorizationResponse { .. } => MessageKind::AuthorizationResponse,
            Message::MonitorRequest { .. } => MessageKind::MonitorRequest,
        }
    }

    /// Decodes one message from the stream.
    pub async fn read<R>(reader: &mut R) -> Result<Message, MessageError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut tag = [0u8; 1];
        if let Err(error) = reader.read_exact(&mut tag).await {
            // Only the tag byte marks a message boundary.
            return Err(if error.kind() == io::ErrorKind::UnexpectedEof {
                MessageError::EndOfStream
            } else {
                MessageError::Io(error)
            });
        }

        match MessageKind::try_from(tag[0])? {
            MessageKind::InteractorAdvertisement => Ok(Message::InteractorAdvertisement {
                user: reader.read_string().await?,
                address: reader.read_ip_address().await?,
                is_joining: reader.read_bool().await?,
            }),
            MessageKind::MulticastData => Ok(Message::MulticastData {
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
                is_image: reader.read_bool().await?,
                data: reader.read_data_packets().await?,
            }),
            MessageKind::UnicastData => Ok(Message::UnicastData {
                client_id: reader.read_uuid().await?,
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
                is_image: reader.read_bool().await?,
                data: reader.read_data_packets().await?,
            }),
            MessageKind::ForwardedMulticastData => Ok(Message::ForwardedMulticastData {
                user: reader.read_string().await?,
                address: reader.read_ip_address().await?,
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
                is_image: reader.read_bool().await?,
                data: reader.read_data_packets().await?,
            }),
            MessageKind::ForwardedUnicastData => Ok(Message::ForwardedUnicastData {
                user: reader.read_string().await?,
                address: reader.read_ip_address().await?,
                client_id: reader.read_uuid().await?,
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
                is_image: reader.read_bool().await?,
                data: reader.read_data_packets().await?,
            }),
            MessageKind::ForwardedSubscriptionRequest => {
                Ok(Message::ForwardedSubscriptionRequest {
                    user: reader.read_string().await?,
                    address: reader.read_ip_address().await?,
                    client_id: reader.read_uuid().await?,
                    feed: reader.read_string().await?,
                    topic: reader.read_string().await?,
                    is_add: reader.read_bool().await?,
                })
            }
            MessageKind::NotificationRequest => Ok(Message::NotificationRequest {
                feed: reader.read_string().await?,
                is_add: reader.read_bool().await?,
            }),
            MessageKind::SubscriptionRequest => Ok(Message::SubscriptionRequest {
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
                is_add: reader.read_bool().await?,
            }),
            MessageKind::AuthorizationRequest => Ok(Message::AuthorizationRequest {
                client_id: reader.read_uuid().await?,
                address: reader.read_ip_address().await?,
                user: reader.read_string().await?,
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
            }),
            MessageKind::AuthorizationResponse => Ok(Message::AuthorizationResponse {
                client_id: reader.read_uuid().await?,
                feed: reader.read_string().await?,
                topic: reader.read_string().await?,
                is_authorization_required: reader.read_bool().await?,
                entitlements: reader.read_uuid_array().await?,
            }),
            MessageKind::MonitorRequest => Ok(Message::MonitorRequest {
                feed: reader.read_string().await?,
                is_add: reader.read_bool().await?,
            }),
        }
    }

    /// Encodes this message onto the stream. The exact inverse of
    /// [`Message::read`] per kind.
    pub async fn write<W>(&self, writer: &mut W) -> Result<(), MessageError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_u8(self.kind() as u8).await?;
        match self {
            Message::InteractorAdvertisement {
                user,
                address,
                is_joining,
            } => {
                writer.write_string(user).await?;
                writer.write_ip_address(address).await?;
                writer.write_bool(*is_joining).await?;
            }
            Message::MulticastData {
                feed,
                topic,
                is_image,
                data,
            } => {
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_image).await?;
                writer.write_data_packets(data.as_deref()).await?;
            }
            Message::UnicastData {
                client_id,
                feed,
                topic,
                is_image,
                data,
            } => {
                writer.write_uuid(client_id).await?;
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_image).await?;
                writer.write_data_packets(data.as_deref()).await?;
            }
            Message::ForwardedMulticastData {
                user,
                address,
                feed,
                topic,
                is_image,
                data,
            } => {
                writer.write_string(user).await?;
                writer.write_ip_address(address).await?;
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_image).await?;
                writer.write_data_packets(data.as_deref()).await?;
            }
            Message::ForwardedUnicastData {
                user,
                address,
                client_id,
                feed,
                topic,
                is_image,
                data,
            } => {
                writer.write_string(user).await?;
                writer.write_ip_address(address).await?;
                writer.write_uuid(client_id).await?;
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_image).await?;
                writer.write_data_packets(data.as_deref()).await?;
            }
            Message::ForwardedSubscriptionRequest {
                user,
                address,
                client_id,
                feed,
                topic,
                is_add,
            } => {
                writer.write_string(user).await?;
                writer.write_ip_address(address).await?;
                writer.write_uuid(client_id).await?;
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_add).await?;
            }
            Message::NotificationRequest { feed, is_add } => {
                writer.write_string(feed).await?;
                writer.write_bool(*is_add).await?;
            }
            Message::SubscriptionRequest {
                feed,
                topic,
                is_add,
            } => {
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_add).await?;
            }
            Message::AuthorizationRequest {
                client_id,
                address,
                user,
                feed,
                topic,
            } => {
                writer.write_uuid(client_id).await?;
                writer.write_ip_address(address).await?;
                writer.write_string(user).await?;
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
            }
            Message::AuthorizationResponse {
                client_id,
                feed,
                topic,
                is_authorization_required,
                entitlements,
            } => {
                writer.write_uuid(client_id).await?;
                writer.write_string(feed).await?;
                writer.write_string(topic).await?;
                writer.write_bool(*is_authorization_required).await?;
                writer.write_uuid_array(entitlements.as_deref()).await?;
            }
            Message::MonitorRequest { feed, is_add } => {
                writer.write_string(feed).await?;
                writer.write_bool(*is_add).await?;
            }
        }
        Ok(())
    }
}
