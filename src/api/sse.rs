//! Server-Sent Events for streamed turns

use super::handlers::AppError;
use crate::session::SessionError;
use crate::turn::{Emission, TurnResult};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// One event per emitted step, then a final `done` or `error` event once the
/// turn task finishes.
pub fn turn_stream(
    emissions: UnboundedReceiver<Emission>,
    turn: JoinHandle<Result<TurnResult, SessionError>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let steps = UnboundedReceiverStream::new(emissions)
        .map(|e| Ok::<_, Infallible>(emission_to_event(&e)));

    let outcome = futures::stream::once(async move {
        let event = match turn.await {
            Ok(Ok(result)) => done_event(&result),
            Ok(Err(e)) => error_event(AppError::from(e)),
            Err(e) => {
                tracing::error!(error = %e, "Turn task panicked");
                error_event(AppError::Internal)
            }
        };
        Ok::<_, Infallible>(event)
    });

    Sse::new(steps.chain(outcome)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn emission_to_event(emission: &Emission) -> Event {
    let data = json!({
        "type": emission.kind(),
        "message": emission.message(),
    });
    Event::default().event(emission.kind()).data(data.to_string())
}

fn done_event(result: &TurnResult) -> Event {
    let data = json!({
        "type": "done",
        "response": result.text,
    });
    Event::default().event("done").data(data.to_string())
}

fn error_event(error: AppError) -> Event {
    let data = json!({
        "type": "error",
        "message": error.message(),
    });
    Event::default().event("error").data(data.to_string())
}
