//! Live record subscriptions over Server-Sent Events.
//!
//! Frames:
//! - `event: record`, one committed record as JSON
//! - `event: error`, sent at most once (authorization denied), then the stream ends

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use feedline_infra::{FeedSubscription, SubscribeRequest};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::IdentityContext;

/// Frames buffered between the pump and the HTTP body. A client that stops
/// reading backs up into the subscriber's mailbox, which drops oldest.
pub const SSE_FRAME_BUFFER: usize = 16;

type Frames = mpsc::Sender<Result<SseEvent, Infallible>>;

/// GET /subscriptions/:name?containerIds=a,b
///
/// Unknown subscription names and malformed container lists are rejected
/// before the stream opens. Authorization failures arrive as an error frame.
pub async fn subscribe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<IdentityContext>,
    Path(name): Path<String>,
    query: Result<Query<dto::SubscriptionQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                rejection.body_text(),
            );
        }
    };
    let filter_args = match query.filter_args() {
        Ok(args) => args,
        Err(e) => return errors::feed_error_to_response(e),
    };

    let request = SubscribeRequest::new(name, filter_args, ctx.into_identity());
    let subscription = match services.subscribe(request) {
        Ok(sub) => sub,
        Err(e) => return errors::feed_error_to_response(e),
    };

    let (tx, rx) = mpsc::channel::<Result<SseEvent, Infallible>>(SSE_FRAME_BUFFER);
    tokio::spawn(forward(subscription, tx));

    let stream = ReceiverStream::new(rx);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}

/// Pump records into the SSE channel until the subscription ends or the client goes away.
async fn forward(mut subscription: FeedSubscription, tx: Frames) {
    loop {
        let item = tokio::select! {
            item = subscription.next() => item,
            _ = tx.closed() => break,
        };

        match item {
            Some(Ok(record)) => {
                let frame = match SseEvent::default().event("record").json_data(record.as_ref()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(record_id = %record.id, error = %e, "failed to encode record frame");
                        continue;
                    }
                };
                if tx.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
            Some(Err(err)) => {
                tracing::info!(subscriber = %subscription.id(), error = %err, "subscription rejected");
                let frame = SseEvent::default()
                    .event("error")
                    .data(errors::error_frame(&err).to_string());
                let _ = tx.send(Ok(frame)).await;
                break;
            }
            None => break,
        }
    }

    subscription.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedline_auth::Identity;
    use feedline_core::{ContainerId, IdentityId, NewRecord};
    use feedline_infra::{FeedConfig, FilterArgs, RECORD_CREATED_SUBSCRIPTION};
    use serde_json::json;

    #[tokio::test]
    async fn stalled_client_does_not_grow_the_frame_queue() {
        let config = FeedConfig {
            subscriber_capacity: 4,
            ..FeedConfig::default()
        };
        let services = AppServices::in_memory(&config);
        let container = ContainerId::new();
        let (viewer, author) = (IdentityId::new(), IdentityId::new());
        services.grant_membership(container, viewer);

        let mut subscription = services
            .subscribe(SubscribeRequest::new(
                RECORD_CREATED_SUBSCRIPTION,
                FilterArgs::new([container]),
                Some(Identity::new(viewer)),
            ))
            .unwrap();
        assert!(subscription.authorized().await);

        let (tx, mut rx) = mpsc::channel(SSE_FRAME_BUFFER);
        let pump = tokio::spawn(forward(subscription, tx));

        // Nobody reads `rx` while 100 records are published.
        for n in 0..100u32 {
            services
                .append_record(NewRecord::new(container, author, json!({ "n": n })))
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut frames = 0;
        while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
            frames += 1;
        }
        // Channel buffer, one frame in flight, and the mailbox; the rest dropped.
        assert!(frames >= SSE_FRAME_BUFFER);
        assert!(frames <= SSE_FRAME_BUFFER + 1 + config.subscriber_capacity);

        drop(rx);
        services
            .append_record(NewRecord::new(container, author, json!({ "n": "last" })))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), pump).await.unwrap().unwrap();
    }
}
