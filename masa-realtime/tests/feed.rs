mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use masa_data::RequestStatus;
use masa_realtime::{sse_stream, ChangeFeed, FeedError, RowChange, SubscriptionStatus};
use uuid::Uuid;

use support::request;

#[tokio::test]
async fn subscribers_only_see_their_organization() {
    let feed = ChangeFeed::new(16);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut sub_a = feed.subscribe(a);
    let mut sub_b = feed.subscribe(b);

    let row = request(a, RequestStatus::Pending);
    assert_eq!(feed.publish(RowChange::insert("service_requests", a, row.clone())), 1);

    let change = sub_a.recv().await.unwrap();
    assert_eq!(change.new, Some(row));
    assert!(matches!(
        sub_b.recv_timeout(Duration::from_millis(20)).await,
        Err(FeedError::TimedOut(_))
    ));
}

#[tokio::test]
async fn publishing_without_subscribers_is_a_noop() {
    let feed = ChangeFeed::new(4);
    let org = Uuid::new_v4();
    assert_eq!(feed.publish(RowChange::insert("service_requests", org, 1u32)), 0);
    assert_eq!(feed.subscriber_count(org), 0);
}

#[tokio::test]
async fn status_callback_tracks_lifecycle() {
    let feed: ChangeFeed<u32> = ChangeFeed::new(4);
    let org = Uuid::new_v4();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut sub = feed.subscribe_with_status(org, move |s| sink.lock().unwrap().push(s));

    let _ = sub.recv_timeout(Duration::from_millis(10)).await;
    feed.close(org);
    assert!(sub.recv().await.is_none());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            SubscriptionStatus::Subscribed,
            SubscriptionStatus::TimedOut,
            SubscriptionStatus::Closed
        ]
    );
}

#[tokio::test]
async fn lagging_subscribers_skip_ahead() {
    let feed = ChangeFeed::new(2);
    let org = Uuid::new_v4();
    let errors = Arc::new(Mutex::new(0));
    let counter = errors.clone();
    let mut sub = feed.subscribe_with_status(org, move |s| {
        if s == SubscriptionStatus::ChannelError {
            *counter.lock().unwrap() += 1;
        }
    });

    for i in 0..5u32 {
        feed.publish(RowChange::insert("t", org, i));
    }
    let first = sub.recv().await.unwrap();
    assert_eq!(first.new, Some(3));
    assert_eq!(*errors.lock().unwrap(), 1);
}

#[tokio::test]
async fn delivery_after_lag_reports_subscribed_again() {
    let feed = ChangeFeed::new(2);
    let org = Uuid::new_v4();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut sub = feed.subscribe_with_status(org, move |s| sink.lock().unwrap().push(s));

    for i in 0..4u32 {
        feed.publish(RowChange::insert("t", org, i));
    }
    assert_eq!(sub.next().await, Err(FeedError::Lagged(2)));
    assert_eq!(sub.next().await.unwrap().new, Some(2));
    assert_eq!(sub.next().await.unwrap().new, Some(3));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            SubscriptionStatus::Subscribed,
            SubscriptionStatus::ChannelError,
            SubscriptionStatus::Subscribed
        ]
    );
}

#[tokio::test]
async fn sse_stream_ends_when_feed_closes() {
    let feed = ChangeFeed::new(8);
    let org = Uuid::new_v4();
    let stream = sse_stream(feed.subscribe(org));
    tokio::pin!(stream);

    feed.publish(RowChange::insert("service_requests", org, request(org, RequestStatus::Pending)));
    assert!(stream.next().await.is_some());

    feed.close(org);
    assert!(stream.next().await.is_none());
}
