//! # Resilience Tests
//!
//! What the bus does when connections churn:
//!
//! 1. **Disconnect cascades**: dropped clients withdraw their subscriptions
//!    and orphaned topics go stale
//! 2. **Advertisements**: joins and leaves are announced when enabled
//! 3. **Reference counting**: repeated subscribe/unsubscribe keeps state
//!    consistent
//! 4. **Volume**: many topics route independently over one connection

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use uuid::Uuid;

    use feedbus_distributor::{DistributorConfig, ANONYMOUS_USER};

    use crate::integration::support::{
        assert_no_data, connect, next_advertisement, next_data, next_forwarded_subscription,
        quote_packet, random_quote, start_distributor,
    };

    #[tokio::test]
    async fn test_disconnect_withdraws_subscriptions() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (watcher, mut watcher_events) = connect(server.local_addr()).await;
        let (leaver, mut _leaver_events) = connect(server.local_addr()).await;

        watcher.add_notification("FX").unwrap();
        leaver.add_subscription("FX", "GBPUSD").unwrap();
        let added = next_forwarded_subscription(&mut watcher_events).await;
        assert!(added.is_add);

        leaver.close();

        let withdrawn = next_forwarded_subscription(&mut watcher_events).await;
        assert_eq!(withdrawn.feed, "FX");
        assert_eq!(withdrawn.topic, "GBPUSD");
        assert_eq!(withdrawn.client_id, added.client_id);
        assert!(!withdrawn.is_add);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_publisher_disconnect_sends_stale_images() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        let _churn = next_forwarded_subscription(&mut publisher_events).await;

        publisher
            .publish("FX", "GBPUSD", true, Some(vec![quote_packet(Uuid::nil(), &random_quote())]))
            .unwrap();
        let live = next_data(&mut subscriber_events).await;
        assert_eq!(live.user, ANONYMOUS_USER);

        publisher.close();

        // The topic lost its only publisher; subscribers get an empty image
        // marking it stale.
        let stale = next_data(&mut subscriber_events).await;
        assert_eq!(stale.feed, "FX");
        assert_eq!(stale.topic, "GBPUSD");
        assert_eq!(stale.user, "");
        assert!(stale.is_image);
        assert_eq!(stale.data, None);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_advertisements_flow_when_enabled() {
        let config = DistributorConfig {
            advertise_interactors: true,
            ..DistributorConfig::default()
        };
        let server = start_distributor(config).await;

        let (_first, mut first_events) = connect(server.local_addr()).await;
        let (second, mut second_events) = connect(server.local_addr()).await;

        // The incumbent hears about the join; the newcomer gets a snapshot.
        let join = next_advertisement(&mut first_events).await;
        assert_eq!(join.user, ANONYMOUS_USER);
        assert!(join.is_joining);

        let snapshot = next_advertisement(&mut second_events).await;
        assert_eq!(snapshot.user, ANONYMOUS_USER);
        assert!(snapshot.is_joining);

        second.close();

        let leave = next_advertisement(&mut first_events).await;
        assert!(!leave.is_joining);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_subscriptions_are_reference_counted() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (watcher, mut watcher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;

        watcher.add_notification("FX").unwrap();
        publisher.add_notification("FX").unwrap();

        // Two adds, then one remove: still subscribed.
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        subscriber.remove_subscription("FX", "GBPUSD").unwrap();
        for expected_add in [true, true, false] {
            let churn = next_forwarded_subscription(&mut watcher_events).await;
            assert_eq!(churn.is_add, expected_add);
            let churn = next_forwarded_subscription(&mut publisher_events).await;
            assert_eq!(churn.is_add, expected_add);
        }

        publisher.publish("FX", "GBPUSD", true, None).unwrap();
        let delivered = next_data(&mut subscriber_events).await;
        assert_eq!(delivered.topic, "GBPUSD");

        // The final remove clears the subscription.
        subscriber.remove_subscription("FX", "GBPUSD").unwrap();
        let churn = next_forwarded_subscription(&mut publisher_events).await;
        assert!(!churn.is_add);

        publisher.publish("FX", "GBPUSD", false, None).unwrap();
        assert_no_data(&mut subscriber_events).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_resubscribing_after_removal_works() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();

        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        subscriber.remove_subscription("FX", "GBPUSD").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        for expected_add in [true, false, true] {
            let churn = next_forwarded_subscription(&mut publisher_events).await;
            assert_eq!(churn.is_add, expected_add);
        }

        publisher.publish("FX", "GBPUSD", true, None).unwrap();
        let delivered = next_data(&mut subscriber_events).await;
        assert_eq!(delivered.topic, "GBPUSD");

        server.shutdown();
    }

    #[tokio::test]
    async fn test_many_topics_route_independently() {
        let server = start_distributor(DistributorConfig::default()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;

        publisher.add_notification("FX").unwrap();

        let topics: Vec<String> = (0..25).map(|index| format!("PAIR-{index:02}")).collect();
        for topic in &topics {
            subscriber.add_subscription("FX", topic).unwrap();
        }
        for _ in &topics {
            let churn = next_forwarded_subscription(&mut publisher_events).await;
            assert!(churn.is_add);
        }

        for topic in &topics {
            publisher
                .publish("FX", topic, true, Some(vec![quote_packet(Uuid::nil(), &random_quote())]))
                .unwrap();
        }

        let mut seen = HashSet::new();
        for _ in &topics {
            seen.insert(next_data(&mut subscriber_events).await.topic);
        }
        assert_eq!(seen.len(), topics.len());
        for topic in &topics {
            assert!(seen.contains(topic), "missing delivery for {topic}");
        }

        server.shutdown();
    }
}
