//! Frame stream → Server-Sent Events bridge.
//!
//! One `data:` line per frame, JSON payload, terminated by a frame with
//! `done: true`. Dropping the response body cancels the producer task's
//! sends, which is how client disconnects propagate into the engine.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use crate::engine::frames::Frame;

pub fn frame_stream(
    frames: ReceiverStream<Frame>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = frames.map(|frame| {
        let payload = serde_json::to_string(&frame).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(payload))
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
