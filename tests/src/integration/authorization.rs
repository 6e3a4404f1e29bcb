//! # Authorization Tests
//!
//! Entitlement round-trips on a feed with a configured role:
//!
//! ```text
//! [Subscriber] ──SubscriptionRequest──→ [Distributor]
//!                                            │ held pending
//!                                            ↓
//! [Authorizer] ←──AuthorizationRequest── fan-out to Authorize holders
//!      │
//!      └──AuthorizationResponse──→ install + filter, or reject with an
//!                                  empty image
//! ```
//!
//! With `NullStreamSecurity` every connection shares the anonymous
//! localhost identity, so the Authorize grant reaches all of them; the
//! tests pick one connection to answer and let the others ignore the
//! fan-out.
//!
//! ## Test Categories
//!
//! 1. **Granting**: entitled subscribers see only entitled packets
//! 2. **Denial**: an empty grant yields one empty image and no data
//! 3. **Role rejections**: unlicensed publishers and subscribers go nowhere
//! 4. **Monitors**: monitoring an authorized feed is refused

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use uuid::Uuid;

    use feedbus_distributor::config::{FeedRoleConfig, InteractorRoleConfig};
    use feedbus_distributor::{DistributorConfig, Role, RoleSet, ANONYMOUS_USER};

    use crate::integration::support::{
        assert_no_data, connect, next_authorization_request, next_data,
        next_forwarded_subscription, quote_packet, random_quote, start_distributor,
    };

    /// One entitled feed, with the Authorize role granted through the
    /// per-interactor override.
    fn entitled_config() -> DistributorConfig {
        DistributorConfig {
            allow: RoleSet::of(&[Role::Publish, Role::Subscribe, Role::Notify]),
            feed_roles: vec![FeedRoleConfig {
                feed: "LSE".to_string(),
                allow: RoleSet::EMPTY,
                deny: RoleSet::EMPTY,
                requires_entitlement: true,
                interactor_roles: vec![InteractorRoleConfig {
                    address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                    user: ANONYMOUS_USER.to_string(),
                    allow: RoleSet::of(&[Role::Authorize]),
                    deny: RoleSet::EMPTY,
                }],
            }],
            ..DistributorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_entitled_subscriber_sees_only_entitled_packets() {
        let server = start_distributor(entitled_config()).await;
        let (authorizer, mut authorizer_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;

        // Warm up through an open feed so the authorizer is known to be
        // registered before the real subscription arrives.
        authorizer.add_notification("SEQ").unwrap();
        subscriber.add_subscription("SEQ", "ping").unwrap();
        let _warmup = next_forwarded_subscription(&mut authorizer_events).await;

        publisher.add_notification("LSE").unwrap();
        subscriber.add_subscription("LSE", "VOD").unwrap();

        let request = next_authorization_request(&mut authorizer_events).await;
        assert_eq!(request.user, ANONYMOUS_USER);
        assert_eq!(request.feed, "LSE");
        assert_eq!(request.topic, "VOD");

        let granted = Uuid::new_v4();
        authorizer
            .authorize(request.client_id, "LSE", "VOD", true, Some(vec![granted]))
            .unwrap();

        // The churn notification fires only once the verdict installs the
        // subscription.
        let churn = next_forwarded_subscription(&mut publisher_events).await;
        assert_eq!(churn.topic, "VOD");
        assert!(churn.is_add);

        let visible = random_quote();
        publisher
            .publish(
                "LSE",
                "VOD",
                true,
                Some(vec![
                    quote_packet(granted, &visible),
                    quote_packet(Uuid::new_v4(), &random_quote()),
                ]),
            )
            .unwrap();

        let received = next_data(&mut subscriber_events).await;
        let packets = received.data.expect("expected a payload");
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].header, granted);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_denied_subscriber_gets_one_empty_image() {
        let server = start_distributor(entitled_config()).await;
        let (authorizer, mut authorizer_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;
        let (publisher, _publisher_events) = connect(server.local_addr()).await;

        authorizer.add_notification("SEQ").unwrap();
        subscriber.add_subscription("SEQ", "ping").unwrap();
        let _warmup = next_forwarded_subscription(&mut authorizer_events).await;

        subscriber.add_subscription("LSE", "VOD").unwrap();
        let request = next_authorization_request(&mut authorizer_events).await;
        authorizer
            .authorize(request.client_id, "LSE", "VOD", true, None)
            .unwrap();

        let rejection = next_data(&mut subscriber_events).await;
        assert_eq!(rejection.feed, "LSE");
        assert_eq!(rejection.topic, "VOD");
        assert_eq!(rejection.user, "");
        assert!(rejection.is_image);
        assert_eq!(rejection.data, None);

        // No subscription was installed behind the image.
        publisher
            .publish("LSE", "VOD", true, Some(vec![quote_packet(Uuid::new_v4(), &random_quote())]))
            .unwrap();
        assert_no_data(&mut subscriber_events).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_unlicensed_publishers_are_dropped() {
        let config = DistributorConfig {
            allow: RoleSet::of(&[Role::Subscribe, Role::Notify]),
            ..DistributorConfig::default()
        };
        let server = start_distributor(config).await;
        let (watcher, mut watcher_events) = connect(server.local_addr()).await;
        let (subscriber, mut subscriber_events) = connect(server.local_addr()).await;
        let (publisher, _publisher_events) = connect(server.local_addr()).await;

        watcher.add_notification("FX").unwrap();
        subscriber.add_subscription("FX", "GBPUSD").unwrap();
        let _churn = next_forwarded_subscription(&mut watcher_events).await;

        publisher.publish("FX", "GBPUSD", true, None).unwrap();
        assert_no_data(&mut subscriber_events).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_unlicensed_subscribers_are_ignored() {
        let config = DistributorConfig {
            allow: RoleSet::of(&[Role::Publish, Role::Notify]),
            ..DistributorConfig::default()
        };
        let server = start_distributor(config).await;
        let (client, mut client_events) = connect(server.local_addr()).await;

        // The subscription travels ahead of the publish on the same
        // connection; were it installed, the client would hear its own data.
        client.add_subscription("FX", "GBPUSD").unwrap();
        client.publish("FX", "GBPUSD", true, None).unwrap();
        assert_no_data(&mut client_events).await;

        server.shutdown();
    }

    #[tokio::test]
    async fn test_monitoring_an_authorized_feed_is_refused() {
        let server = start_distributor(entitled_config()).await;
        let (publisher, mut publisher_events) = connect(server.local_addr()).await;
        let (monitor, mut monitor_events) = connect(server.local_addr()).await;

        publisher.add_notification("SEQ").unwrap();
        monitor.add_monitor("LSE").unwrap();
        monitor.add_subscription("SEQ", "warmup").unwrap();
        let _churn = next_forwarded_subscription(&mut publisher_events).await;

        publisher
            .publish("LSE", "VOD", true, Some(vec![quote_packet(Uuid::new_v4(), &random_quote())]))
            .unwrap();
        assert_no_data(&mut monitor_events).await;

        server.shutdown();
    }
}
