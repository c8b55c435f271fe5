//! Feed subscriptions as Server-Sent Events.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures_util::stream::{self, Stream};
use serde::Serialize;

use crate::feed::FeedSubscription;

/// Turn a subscription into an SSE stream. Each change becomes an event named
/// after its kind (`INSERT`, `UPDATE`, `DELETE`) with the change as JSON data.
/// The stream ends when the feed closes.
pub fn sse_stream<T>(subscription: FeedSubscription<T>) -> impl Stream<Item = Result<Event, Infallible>>
where
    T: Serialize + Clone + Send + 'static,
{
    stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.recv().await?;
        let event = match Event::default().event(change.kind.as_str()).json_data(&change) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Could not serialize row change");
                Event::default().comment("unserializable change")
            }
        };
        Some((Ok(event), subscription))
    })
}
