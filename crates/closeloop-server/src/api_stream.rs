//! SSE transcript stream handler.

use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use closeloop_registry::{SessionRegistry, SubscriberId};
use closeloop_types::StreamEvent;
use futures_util::{future, stream, Stream, StreamExt};
use std::{convert::Infallible, sync::Arc};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Per-subscriber channel capacity. The registry drops a subscriber whose
/// channel stays full, so this bounds how far one slow client can lag.
const CHANNEL_CAPACITY: usize = 64;

/// Unsubscribes when the SSE response body is dropped. Owned by the stream
/// closure, so client disconnect (axum dropping the body) releases the
/// registry entry without any explicit cancellation handling.
struct UnsubscribeGuard {
    registry: SessionRegistry,
    call_sid: String,
    id: SubscriberId,
}

impl Drop for UnsubscribeGuard {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.call_sid, self.id);
    }
}

/// Handler for `GET /api/calls/{callSid}/stream`.
///
/// Streams the call's transcript events in real time. The first event is a
/// `connected` acknowledgement; after that, every registry push for the
/// call is forwarded as one SSE data event. Events appended before this
/// subscriber attached are not replayed.
pub async fn get_call_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let subscriber_id = state.registry.subscribe(&call_sid, tx);
    let guard = UnsubscribeGuard {
        registry: state.registry.clone(),
        call_sid: call_sid.clone(),
        id: subscriber_id,
    };

    let connected = StreamEvent::Connected {
        call_sid: call_sid.clone(),
    };
    let events = stream::once(future::ready(connected)).chain(ReceiverStream::new(rx));

    let mapped = events.filter_map(move |event| {
        let _ = &guard;
        future::ready(match serde_json::to_string(&event) {
            Ok(data) => Some(Ok(Event::default().data(data))),
            Err(e) => {
                tracing::error!("failed to serialize stream event: {}", e);
                None
            }
        })
    });

    Sse::new(mapped).keep_alive(KeepAlive::default())
}
