//! Subscribe-request scenarios
//!
//! Run with: cargo test -p integration-tests --test subscription_tests

use std::sync::Arc;
use std::time::Duration;

use adwatch_bus::{BridgeError, EventBus, LocalBus, SubscribeBridge, SubscribeRequest};
use adwatch_core::ClientError;
use adwatch_fleet::{LoadBalancer, NO_USERBOT_AVAILABLE};
use integration_tests::*;

const NEWS_ID: i64 = 1_001_234_567;

fn news_client(session_id: i64) -> Arc<FakeClient> {
    FakeClient::new(session_id).with_public("news123", channel_info(NEWS_ID, "News", Some("news123")))
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_public_join_over_the_bus() {
    let store = Arc::new(MemoryStore::with_sessions(&[1]));
    let factory = FakeFactory::new();
    factory.register(news_client(1));

    let mut fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1]).await);
    fleet.listen().await;

    let response = fleet
        .bridge(Duration::from_secs(5))
        .request(42, vec!["t.me/news123".to_string()])
        .await
        .expect("response");

    assert!(response.success);
    assert_eq!(response.user_id, 42);
    assert_eq!(response.userbot_id, 1);
    let result = &response.results[0];
    assert!(result.success);
    assert_eq!(result.telegram_id, Some(NEWS_ID));
    assert_eq!(result.title.as_deref(), Some("News"));
    assert_eq!(result.username.as_deref(), Some("news123"));

    let channel = store.channel_by_telegram_id(NEWS_ID).expect("channel stored");
    assert!(!channel.is_private);
    assert_eq!(channel.link_subscription.as_deref(), Some("https://t.me/news123"));
    assert_eq!(store.owners(channel.id), vec![1]);

    fleet.stop().await;
}

#[tokio::test]
async fn test_already_member_recovers_identity() {
    let store = Arc::new(MemoryStore::with_sessions(&[1]));
    let factory = FakeFactory::new();
    let client = factory.register(news_client(1));

    let fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1]).await);
    let handler = fleet.subscription_handler();

    let first = handler
        .handle_request(&SubscribeRequest::new(1, vec!["t.me/news123".to_string()]))
        .await;
    assert!(first.results[0].success);
    assert!(client.has_joined("news123"));

    let second = handler
        .handle_request(&SubscribeRequest::new(1, vec!["https://t.me/news123".to_string()]))
        .await;
    assert!(second.success);
    assert_eq!(second.results[0].telegram_id, Some(NEWS_ID));
    assert_eq!(second.results[0].username.as_deref(), Some("news123"));
    assert_eq!(store.channel_count(), 1);

    fleet.stop().await;
}

#[tokio::test]
async fn test_invite_join_creates_private_channel() {
    let store = Arc::new(MemoryStore::with_sessions(&[1]));
    let factory = FakeFactory::new();
    factory.register(
        FakeClient::new(1).with_invite("abc123", channel_info(2_002, "Closed club", None)),
    );

    let fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1]).await);

    let response = fleet
        .subscription_handler()
        .handle_request(&SubscribeRequest::new(5, vec!["t.me/+abc123".to_string()]))
        .await;

    assert!(response.results[0].success);
    assert_eq!(response.results[0].username, None);
    let channel = store.channel_by_telegram_id(2_002).expect("channel stored");
    assert!(channel.is_private);
    assert_eq!(channel.link_subscription.as_deref(), Some("https://t.me/+abc123"));
    assert_eq!(channel.public_link(), "https://t.me/+abc123");

    fleet.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_times_out() {
    let bus: Arc<dyn EventBus> = Arc::new(LocalBus::new());
    let bridge = SubscribeBridge::new(bus, Duration::from_secs(60));

    let started = tokio::time::Instant::now();
    let outcome = bridge.request(9, vec!["t.me/news123".to_string()]).await;

    assert!(matches!(outcome, Err(BridgeError::Timeout { .. })));
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(60));
    assert!(waited < Duration::from_secs(61));
}

// ============================================================================
// Per-link failures and rejection
// ============================================================================

#[tokio::test]
async fn test_no_session_rejects_every_link() {
    let fleet = TestFleet::start(Arc::new(MemoryStore::new()), FakeFactory::new()).await;

    let response = fleet
        .subscription_handler()
        .handle_request(&SubscribeRequest::new(
            3,
            vec!["t.me/news123".to_string(), "t.me/+abc123".to_string()],
        ))
        .await;

    assert!(!response.success);
    assert_eq!(response.error_message.as_deref(), Some(NO_USERBOT_AVAILABLE));
    assert_eq!(response.userbot_id, 0);
    assert_eq!(response.results.len(), 2);
    assert!(response.results.iter().all(|r| !r.success));

    fleet.stop().await;
}

#[tokio::test]
async fn test_failed_links_do_not_fail_the_request() {
    let store = Arc::new(MemoryStore::with_sessions(&[1]));
    let factory = FakeFactory::new();
    factory.register(news_client(1));

    let fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1]).await);

    let response = fleet
        .subscription_handler()
        .handle_request(&SubscribeRequest::new(
            3,
            vec![
                "not a link at all".to_string(),
                "t.me/missing_channel".to_string(),
                "t.me/news123".to_string(),
            ],
        ))
        .await;

    assert!(response.success);
    assert_eq!(response.userbot_id, 1);
    let outcomes: Vec<bool> = response.results.iter().map(|r| r.success).collect();
    assert_eq!(outcomes, vec![false, false, true]);
    assert_eq!(store.channel_count(), 1);

    fleet.stop().await;
}

#[tokio::test]
async fn test_idle_store_row_without_client_is_skipped() {
    let store = Arc::new(MemoryStore::with_sessions(&[1, 2]));
    store.add_owned_channel(2_001, "busy_one", 1);
    let factory = FakeFactory::new();
    factory.register(news_client(1));
    factory.register(news_client(2));

    let fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1, 2]).await);
    // Session 2 stays eligible in the store but has no running client
    assert!(fleet.fleet.remove_session(2).await.unwrap());

    let response = fleet
        .subscription_handler()
        .handle_request(&SubscribeRequest::new(5, vec!["t.me/news123".to_string()]))
        .await;

    assert!(response.success);
    assert_eq!(response.userbot_id, 1);
    assert!(response.results[0].success);
    let channel = store.channel_by_telegram_id(NEWS_ID).expect("channel stored");
    assert_eq!(store.owners(channel.id), vec![1]);

    fleet.stop().await;
}

#[tokio::test]
async fn test_ban_while_joining_retires_session() {
    let store = Arc::new(MemoryStore::with_sessions(&[1]));
    let factory = FakeFactory::new();
    let client = factory.register(news_client(1));
    client.fail_joins_with(ClientError::Banned("USER_DEACTIVATED_BAN".to_string()));

    let fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1]).await);

    let response = fleet
        .subscription_handler()
        .handle_request(&SubscribeRequest::new(3, vec!["t.me/news123".to_string()]))
        .await;
    assert!(!response.results[0].success);

    let retired = wait_until(|| {
        let store = store.clone();
        async move { store.session(1).is_some_and(|s| !s.is_active) }
    })
    .await;
    assert!(retired);
    assert_eq!(
        store.session(1).and_then(|s| s.last_error).as_deref(),
        Some("banned: USER_DEACTIVATED_BAN")
    );
    assert!(!fleet.fleet.is_live(1));

    fleet.stop().await;
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_concurrent_requests_get_their_own_responses() {
    let store = Arc::new(MemoryStore::with_sessions(&[1]));
    let factory = FakeFactory::new();
    factory.register(
        news_client(1).with_public("sports_daily", channel_info(3_003, "Sports", Some("sports_daily"))),
    );

    let mut fleet = TestFleet::start(store, factory).await;
    assert!(fleet.wait_live(&[1]).await);
    fleet.listen().await;

    let bridge = fleet.bridge(Duration::from_secs(5));
    let news = SubscribeRequest::new(100, vec!["t.me/news123".to_string()]);
    let sports = SubscribeRequest::new(200, vec!["t.me/sports_daily".to_string()]);
    let (news_id, sports_id) = (news.request_id.clone(), sports.request_id.clone());

    let (news_response, sports_response) = tokio::join!(bridge.send(news), bridge.send(sports));
    let news_response = news_response.expect("news response");
    let sports_response = sports_response.expect("sports response");

    assert_eq!(news_response.request_id, news_id);
    assert_eq!(news_response.user_id, 100);
    assert_eq!(news_response.results[0].telegram_id, Some(NEWS_ID));
    assert_eq!(sports_response.request_id, sports_id);
    assert_eq!(sports_response.user_id, 200);
    assert_eq!(sports_response.results[0].telegram_id, Some(3_003));

    fleet.stop().await;
}

#[tokio::test]
async fn test_resubscribe_keeps_single_owner() {
    let store = Arc::new(MemoryStore::with_sessions(&[1, 2]));
    let factory = FakeFactory::new();
    factory.register(news_client(1));
    factory.register(news_client(2));

    let fleet = TestFleet::start(store.clone(), factory).await;
    assert!(fleet.wait_live(&[1, 2]).await);
    let handler = fleet.subscription_handler();

    let first = handler
        .handle_request(&SubscribeRequest::new(1, vec!["t.me/news123".to_string()]))
        .await;
    assert_eq!(first.userbot_id, 1);

    // Session 1 now carries the load, so the balancer moves the channel to 2
    let second = handler
        .handle_request(&SubscribeRequest::new(1, vec!["t.me/news123".to_string()]))
        .await;
    assert_eq!(second.userbot_id, 2);

    let channel = store.channel_by_telegram_id(NEWS_ID).expect("channel stored");
    assert_eq!(store.owners(channel.id), vec![2]);
    assert!(store.multi_owned_channels().is_empty());

    fleet.stop().await;
}

#[tokio::test]
async fn test_balancer_follows_the_minimum() {
    let store = Arc::new(MemoryStore::with_sessions(&[1, 2, 3]));
    store.add_owned_channel(10, "chan_a1", 1);
    store.add_owned_channel(11, "chan_a2", 1);
    store.add_owned_channel(12, "chan_c1", 3);

    let balancer = LoadBalancer::new(store.clone());

    let best = balancer.select_best_session().await.unwrap().expect("a session");
    assert_eq!(best.id, 2);

    store.add_owned_channel(13, "chan_b1", 2);
    store.add_owned_channel(14, "chan_b2", 2);

    // Counts are now 2, 2, 1
    let best = balancer.select_best_session().await.unwrap().expect("a session");
    assert_eq!(best.id, 3);
}
