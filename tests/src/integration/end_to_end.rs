//! # End-to-End Routing Tests
//!
//! The open-bus flows, each over a real socket pair:
//!
//! ```text
//! [Publisher] ──MulticastData──→ [Distributor] ──ForwardedMulticastData──→ [Subscribers]
//!      ↑                              │
//!      └──ForwardedSubscription───────┘  (notification churn, used as the
//!                                         cross-connection ordering barrier)
//! ```
//!
//! ## Test Categories
//!
//! 1. **Fan-out**: multicast reaches every subscriber of the topic
//! 2. **Addressing**: unicast reaches exactly the named client
//! 3. **Lifecycle**: unsubscribing stops delivery
//! 4. **Monitors**: a feed monitor sees every topic without naming them
//! 5. **Heartbeats**: the admin feed surfaces as heartbeat events

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use uuid::Uuid;

    use feedbus_client::{ClientConfig, ClientEvent};
    use feedbus_distributor::{DistributorConfig, ANONYMOUS_USER};

    use crate::integration::support::{
        assert_no_data, connect, connect_with, decode_quote, next_data, next_event,
        next_forwarded_subscription, quote_packet, random_quote, start_distributor,
    };

    #[tokio::test]
    async fn test_published_data_reaches_the_subscriber() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();

        // The churn notification doubles as proof the subscription is live.
        let churn = next_forwarded_subscription(&mut publisher_events).await;
        assert_eq!(churn.feed, "FX");
        assert_eq!(churn.topic, "GBPUSD");
        assert!(churn.is_add);

        let quote = random_quote();
        publisher
            .publish("FX", "GBPUSD", true, Some(vec![quote_packet(Uuid::nil(), &quote)]))
            .unwrap();

        let received = next_data(&mut subscriber_events).await;
        assert_eq!(received.user, ANONYMOUS_USER);
        assert_eq!(received.feed, "FX");
        assert_eq!(received.topic, "GBPUSD");
        assert!(received.is_image);
        let packets = received.data.expect("expected a payload");
        assert_eq!(packets.len(), 1);
        assert_eq!(decode_quote(&packets[0]), quote);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_multicast_fans_out_to_every_subscriber() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (first, mut first_events) = connect(server.local_addr()).await;
        let (second, mut second_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();
        first.add_subscription("FX", "GBPUSD").unwrap();
        second.add_subscription("FX", "GBPUSD").unwrap();
        let _churn = next_forwarded_subscription(&mut publisher_events).await;
        let _churn = next_forwarded_subscription(&mut publisher_events).await;

        publisher.publish("FX", "GBPUSD", false, None).unwrap();

        for events in [&mut first_events, &mut second_events] {
            let received = next_data(events).await;
            assert_eq!(received.topic, "GBPUSD");
            assert!(!received.is_image);
            assert_eq!(received.data, None);
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_updates_arrive_in_publication_order() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        let _churn = next_forwarded_subscription(&mut publisher_events).await;

        for sequence in 0u8..5 {
            publisher
                .publish(
                    "FX",
                    "GBPUSD",
                    sequence == 0,
                    Some(vec![feedbus_messages::DataPacket::new(
                        Uuid::nil(),
                        vec![sequence],
                    )]),
                )
                .unwrap();
        }

        for sequence in 0u8..5 {
            let received = next_data(&mut subscriber_events).await;
            assert_eq!(received.is_image, sequence == 0);
            assert_eq!(received.data.unwrap()[0].body, vec![sequence]);
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn test_unicast_reaches_only_the_named_client() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (target, mut target_events) = connect(server.local_addr()).await;
        let (bystander, mut bystander_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();
        // Distinct topics let the churn events identify which client id
        // belongs to which connection.
        target.add_subscription("FX", "TARGET").unwrap();
        bystander.add_subscription("FX", "OTHER").unwrap();

        let mut target_id = None;
        for _ in 0..2 {
            let churn = next_forwarded_subscription(&mut publisher_events).await;
            if churn.topic == "TARGET" {
                target_id = Some(churn.client_id);
            }
        }
        let target_id = target_id.expect("never saw the target subscription");

        let quote = random_quote();
        publisher
            .send(
                target_id,
                "FX",
                "TARGET",
                true,
                Some(vec![quote_packet(Uuid::nil(), &quote)]),
            )
            .unwrap();

        let received = next_data(&mut target_events).await;
        assert_eq!(received.topic, "TARGET");
        assert_eq!(decode_quote(&received.data.expect("expected a payload")[0]), quote);
        assert_no_data(&mut bystander_events).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_unsubscribing_stops_delivery() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        let _added = next_forwarded_subscription(&mut publisher_events).await;

        publisher.publish("FX", "GBPUSD", true, None).unwrap();
        let _delivered = next_data(&mut subscriber_events).await;

        subscriber.remove_subscription("FX", "GBPUSD").unwrap();
        let withdrawal = next_forwarded_subscription(&mut publisher_events).await;
        assert!(!withdrawal.is_add);

        publisher.publish("FX", "GBPUSD", false, None).unwrap();
        assert_no_data(&mut subscriber_events).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_monitor_sees_every_topic_on_the_feed() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (monitor, mut monitor_events) = connect(server.local_addr()).await;

        // The monitor request travels ahead of the warmup subscription on
        // the same connection, so the churn below proves both are live.
        monitor.add_monitor("FX").unwrap();
        monitor.add_subscription("FX", "warmup").unwrap();
        publisher.add_notification("FX").unwrap();
        let _churn = next_forwarded_subscription(&mut publisher_events).await;

        publisher.publish("FX", "GBPUSD", true, None).unwrap();
        publisher.publish("FX", "EURUSD", true, None).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..2 {
            seen.insert(next_data(&mut monitor_events).await.topic);
        }
        assert!(seen.contains("GBPUSD"));
        assert!(seen.contains("EURUSD"));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_heartbeats_surface_when_monitored() {
        let config = DistributorConfig {
            heartbeat_interval_ms: 50,
            ..DistributorConfig::default()
        };
        let server = start_distributor(config).await;

        let (_client, mut events) = connect_with(
            server.local_addr(),
            ClientConfig {
                monitor_heartbeat: true,
            },
        )
        .await;

        loop {
            if matches!(next_event(&mut events).await, ClientEvent::Heartbeat) {
                break;
            }
        }

        server.shutdown();
    }
}
