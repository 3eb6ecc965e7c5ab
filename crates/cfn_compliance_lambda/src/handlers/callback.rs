use serde_json::{json, Value};

use crate::adapters::callback::CallbackTransport;
use crate::handlers::create::{CallbackOutcome, InvocationIdentity};
use crate::runtime::contract::{CallbackBody, CustomResourceEvent};

/// Ready-to-send callback PUT. The body is serialized once so the
/// content-length header always matches the exact bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackRequest {
    pub url: String,
    pub body: Vec<u8>,
}

/// Builds the callback request for an invocation, or `None` when the event
/// carries no `ResponseURL`. The log stream name serves as the physical
/// resource id; it is stable across repeated invocations of the same
/// execution environment.
pub fn build_callback_request(
    event: &CustomResourceEvent,
    identity: &InvocationIdentity,
    outcome: &CallbackOutcome,
) -> Option<CallbackRequest> {
    let url = event.response_url.clone()?;

    let body = CallbackBody {
        status: outcome.status,
        reason: outcome
            .reason
            .clone()
            .unwrap_or_else(|| format!("CWL Log Stream = {}", identity.log_stream)),
        physical_resource_id: identity.log_stream.clone(),
        stack_id: event.stack_id.clone(),
        request_id: event.request_id.clone(),
        logical_resource_id: event.logical_resource_id.clone(),
        data: outcome.data.clone(),
    };

    Some(CallbackRequest {
        url,
        body: serde_json::to_vec(&body).expect("callback body should serialize"),
    })
}

/// Headers required by the presigned callback URL: an empty content type and
/// an explicit content length.
pub fn callback_headers(body: &[u8]) -> [(&'static str, String); 2] {
    [
        ("content-type", String::new()),
        ("content-length", body.len().to_string()),
    ]
}

/// Best-effort delivery of the callback. Transport failures are logged and
/// swallowed: the stack engine detects a missing callback through its own
/// timeout, and there is no one left to report the failure to.
pub fn deliver_callback(
    event: &CustomResourceEvent,
    identity: &InvocationIdentity,
    outcome: &CallbackOutcome,
    transport: &dyn CallbackTransport,
) {
    let Some(request) = build_callback_request(event, identity, outcome) else {
        log_info(
            "callback_skipped",
            json!({"request_id": event.request_id.clone()}),
        );
        return;
    };

    match transport.put(&request.url, &request.body) {
        Ok(()) => log_info(
            "callback_delivered",
            json!({
                "request_id": event.request_id.clone(),
                "status": outcome.status,
                "body_bytes": request.body.len(),
            }),
        ),
        Err(error) => log_error(
            "callback_failed",
            json!({
                "request_id": event.request_id.clone(),
                "error": error,
            }),
        ),
    }
}

fn log_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "callback",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "callback",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
