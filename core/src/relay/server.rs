// Relay mailbox HTTP server
//
// Three routes over a single-slot mailbox:
//   POST /receive      store an envelope, overwriting any prior content
//   GET  /get_message  read the current slot (reads never clear it)
//   GET  /whoami       report this host's name for the discovery scanner
//
// The slot lock only guards the copy in and out. A read overlapping a write
// may observe either value, and two concurrent receives race with a
// last-write-wins outcome — the accepted protocol behavior, not a defect.

use hyper::body::Bytes;
use parking_lot::RwLock;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Filter;

/// Single-slot mailbox holding at most one envelope, owned by the server
/// instance and handed to the request handlers.
#[derive(Clone, Default)]
pub struct Mailbox {
    slot: Arc<RwLock<Option<String>>>,
}

impl Mailbox {
    /// Fresh empty mailbox, created at server start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an envelope, unconditionally replacing any prior content.
    pub fn store(&self, envelope: String) {
        *self.slot.write() = Some(envelope);
    }

    /// Current content; None until the first successful receive.
    pub fn current(&self) -> Option<String> {
        self.slot.read().clone()
    }
}

/// The relay's route tree over the given mailbox.
pub fn routes(
    mailbox: Mailbox,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    let receive = warp::path!("receive")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_mailbox(mailbox.clone()))
        .map(|body: Bytes, mailbox: Mailbox| receive_reply(&body, &mailbox));

    let get_message = warp::path!("get_message")
        .and(warp::get())
        .and(with_mailbox(mailbox))
        .map(|mailbox: Mailbox| get_message_reply(&mailbox));

    let whoami = warp::path!("whoami").and(warp::get()).map(whoami_reply);

    receive.or(get_message).or(whoami)
}

fn with_mailbox(
    mailbox: Mailbox,
) -> impl Filter<Extract = (Mailbox,), Error = Infallible> + Clone {
    warp::any().map(move || mailbox.clone())
}

/// A missing, non-string, or empty `encrypted_msg` (including an unparseable
/// body) is a validation error and leaves the slot untouched.
fn receive_reply(body: &[u8], mailbox: &Mailbox) -> Response {
    let envelope = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("encrypted_msg")
                .and_then(|msg| msg.as_str())
                .map(str::to_owned)
        })
        .filter(|msg| !msg.is_empty());

    match envelope {
        Some(envelope) => {
            debug!("storing envelope of {} bytes", envelope.len());
            mailbox.store(envelope);
            warp::reply::with_status("Received", StatusCode::OK).into_response()
        }
        None => warp::reply::with_status(
            warp::reply::json(&json!({"error": "Missing encrypted_msg"})),
            StatusCode::BAD_REQUEST,
        )
        .into_response(),
    }
}

fn get_message_reply(mailbox: &Mailbox) -> Response {
    match mailbox.current() {
        Some(envelope) => {
            warp::reply::json(&json!({"encrypted_msg": envelope})).into_response()
        }
        None => warp::reply::with_status(
            warp::reply::json(&json!({"message": "No message stored"})),
            StatusCode::NOT_FOUND,
        )
        .into_response(),
    }
}

fn whoami_reply() -> Response {
    match hostname::get().ok().and_then(|name| name.into_string().ok()) {
        Some(device_name) => {
            warp::reply::json(&json!({"device_name": device_name})).into_response()
        }
        None => warp::reply::with_status(
            warp::reply::json(&json!({"error": "hostname unavailable"})),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .into_response(),
    }
}
