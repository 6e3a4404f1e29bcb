//! Shared fixtures for the integration suite.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use uuid::Uuid;

use feedbus_client::{
    ByteEncoder, Client, ClientConfig, ClientEvent, ClientEventStream, JsonByteEncoder,
};
use feedbus_distributor::{DistributorConfig, NullStreamSecurity, Server};
use feedbus_messages::DataPacket;

/// Generous upper bound for traffic that must arrive.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long nothing has to arrive before we call it silence.
pub const SILENCE: Duration = Duration::from_millis(200);

/// Start a distributor on an ephemeral localhost port.
pub async fn start_distributor(config: DistributorConfig) -> Server {
    let config = DistributorConfig {
        address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        ..config
    };
    Server::start(config, Arc::new(NullStreamSecurity))
        .await
        .expect("distributor failed to start")
}

/// Connect a client and swallow the initial connection event.
pub async fn connect(addr: SocketAddr) -> (Client, ClientEventStream) {
    connect_with(addr, ClientConfig::default()).await
}

pub async fn connect_with(addr: SocketAddr, config: ClientConfig) -> (Client, ClientEventStream) {
    let (client, mut events) = Client::connect(addr, config)
        .await
        .expect("client failed to connect");
    match next_event(&mut events).await {
        ClientEvent::ConnectionChanged(_) => {}
        other => panic!("expected a connection event, got {other:?}"),
    }
    (client, events)
}

pub async fn next_event(events: &mut ClientEventStream) -> ClientEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.next())
        .await
        .expect("timed out waiting for an event")
        .expect("event stream ended")
}

pub struct ReceivedData {
    pub user: String,
    pub address: IpAddr,
    pub feed: String,
    pub topic: String,
    pub is_image: bool,
    pub data: Option<Vec<DataPacket>>,
}

/// The next data event, skipping unrelated traffic. With the shared
/// anonymous identity, authorization requests fan out to every client, so
/// tests filter instead of assuming a quiet stream.
pub async fn next_data(events: &mut ClientEventStream) -> ReceivedData {
    loop {
        if let ClientEvent::Data {
            user,
            address,
            feed,
            topic,
            is_image,
            data,
        } = next_event(events).await
        {
            return ReceivedData {
                user,
                address,
                feed,
                topic,
                is_image,
                data,
            };
        }
    }
}

pub struct ReceivedSubscription {
    pub user: String,
    pub client_id: Uuid,
    pub feed: String,
    pub topic: String,
    pub is_add: bool,
}

pub async fn next_forwarded_subscription(events: &mut ClientEventStream) -> ReceivedSubscription {
    loop {
        if let ClientEvent::ForwardedSubscription {
            user,
            client_id,
            feed,
            topic,
            is_add,
            ..
        } = next_event(events).await
        {
            return ReceivedSubscription {
                user,
                client_id,
                feed,
                topic,
                is_add,
            };
        }
    }
}

pub struct ReceivedAuthorizationRequest {
    pub client_id: Uuid,
    pub user: String,
    pub feed: String,
    pub topic: String,
}

pub async fn next_authorization_request(
    events: &mut ClientEventStream,
) -> ReceivedAuthorizationRequest {
    loop {
        if let ClientEvent::AuthorizationRequest {
            client_id,
            user,
            feed,
            topic,
            ..
        } = next_event(events).await
        {
            return ReceivedAuthorizationRequest {
                client_id,
                user,
                feed,
                topic,
            };
        }
    }
}

pub struct ReceivedAdvertisement {
    pub user: String,
    pub is_joining: bool,
}

pub async fn next_advertisement(events: &mut ClientEventStream) -> ReceivedAdvertisement {
    loop {
        if let ClientEvent::Advertisement {
            user, is_joining, ..
        } = next_event(events).await
        {
            return ReceivedAdvertisement { user, is_joining };
        }
    }
}

/// Assert that no data event arrives within the silence window.
pub async fn assert_no_data(events: &mut ClientEventStream) {
    let outcome = tokio::time::timeout(SILENCE, async {
        loop {
            match events.next().await {
                Some(ClientEvent::Data { feed, topic, .. }) => return (feed, topic),
                Some(_) => continue,
                None => std::future::pending().await,
            }
        }
    })
    .await;
    if let Ok((feed, topic)) = outcome {
        panic!("unexpected data delivery on {feed}/{topic}");
    }
}

/// A stand-in for application payloads, carried through the JSON encoder.
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

pub fn random_quote() -> Quote {
    let mid: f64 = 1.0 + rand::random::<f64>();
    Quote {
        bid: mid - 0.0001,
        ask: mid + 0.0001,
    }
}

pub fn quote_packet(header: Uuid, quote: &Quote) -> DataPacket {
    let body = JsonByteEncoder.encode(quote).expect("encode failed");
    DataPacket::new(header, body)
}

pub fn decode_quote(packet: &DataPacket) -> Quote {
    JsonByteEncoder
        .decode(&packet.body)
        .expect("payload was not a quote")
}
