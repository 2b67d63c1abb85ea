//! Retry timing of the generation client against a scripted transport.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ration_core::generation::{ChatMessage, CompletionOptions, GenerationError, TransportError};

use common::ScriptedTransport;

fn server_error() -> TransportError {
    TransportError::Status {
        status: 500,
        body: "internal error".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn two_server_errors_then_success_back_off_one_then_two_seconds() {
    let attempts = AtomicUsize::new(0);
    let transport = Arc::new(ScriptedTransport::new(move |_| {
        match attempts.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => Err(server_error()),
            _ => Ok("{\"ok\": true}".into()),
        }
    }));
    let client = common::client(transport.clone());

    let text = client
        .complete(vec![ChatMessage::user("ping")], CompletionOptions::json(0.2))
        .await
        .unwrap();
    assert_eq!(text, "{\"ok\": true}");

    let times = transport.request_times();
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= Duration::from_secs(1));
    assert!(times[2] - times[1] >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn blank_responses_exhaust_attempts() {
    let transport = Arc::new(ScriptedTransport::new(|_| Ok("   \n".into())));
    let client = common::client(transport.clone());

    let err = client
        .complete(vec![ChatMessage::user("ping")], CompletionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::Exhausted {
            attempts: 3,
            source: TransportError::EmptyResponse
        }
    ));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::new(|_| {
        Err(TransportError::Status {
            status: 401,
            body: "bad key".into(),
        })
    }));
    let client = common::client(transport.clone());

    let err = client
        .complete(vec![ChatMessage::user("ping")], CompletionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Rejected { .. }));
    assert_eq!(transport.calls(), 1);
}
