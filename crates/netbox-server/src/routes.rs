//! HTTP routes.
//!
//! | Method/Path | Success | Failure |
//! |---|---|---|
//! | `GET /api/connect` | 200 `{message, filename, session_id}` | 500 `{message: "Failed to connect", kind, step?, device?}` |
//! | `GET /api/readsamples?write=true` | 200 `{fz, ax, ay, az}` | 500 `{message: "Internal Server Error", ..}` |
//! | `GET /api/tareheiden` | 200 `{message: "heidenhain tare successful"}` | 500 |
//! | `GET /api/tareloadcell` | 200, message names the write outcome | 500 |
//! | `GET /api/disconnect` | 200 `{message: "Disconnected"}` | 500 `{message: "Internal server Error", ..}` |
//! | `GET /api/status` | 200 bridge status | 500 |
//!
//! Rows are written only when the first `write` query value decodes to
//! exactly `true`. CORS is layered on in [`crate::server`].

use std::convert::Infallible;

use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info};
use url::form_urlencoded;

use netbox_hardware::{ConfigWriteResult, DeviceKind};

use crate::state::{AppState, CallError};

const CONNECTED: &str = "Connection sucessful";
const CONNECT_FAILED: &str = "Failed to connect";
const INTERNAL_ERROR: &str = "Internal Server Error";
const DISCONNECT_FAILED: &str = "Internal server Error";
const DISCONNECTED: &str = "Disconnected";
const ENCODER_TARED: &str = "heidenhain tare successful";
const LOAD_CELL_TARED: &str = "clipX tare successful";
const LOAD_CELL_TARE_REJECTED: &str = "clipX tare unsuccessful";

/// Paths served by [`handle`].
pub const ROUTES: [&str; 6] = [
    "/api/connect",
    "/api/readsamples",
    "/api/tareheiden",
    "/api/tareloadcell",
    "/api/disconnect",
    "/api/status",
];

#[derive(Debug, Serialize)]
struct Message<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct Connected<'a> {
    message: &'a str,
    filename: &'a str,
    session_id: String,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    message: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<DeviceKind>,
}

/// Serve one request.
pub async fn handle(state: AppState, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%method, %path, "Request");

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/api/connect") => connect(&state).await,
        (&Method::GET, "/api/readsamples") => read_samples(&state, write_requested(&req)).await,
        (&Method::GET, "/api/tareheiden") => tare_encoder(&state).await,
        (&Method::GET, "/api/tareloadcell") => tare_load_cell(&state).await,
        (&Method::GET, "/api/disconnect") => disconnect(&state).await,
        (&Method::GET, "/api/status") => status(&state).await,
        (_, p) if ROUTES.contains(&p) => method_not_allowed(),
        _ => json(StatusCode::NOT_FOUND, &Message { message: "Not Found" }),
    };

    info!(%method, %path, status = response.status().as_u16(), "Request served");
    Ok(response)
}

/// `true` when the first `write` query value is `true`.
fn write_requested(req: &Request<Body>) -> bool {
    req.uri().query().is_some_and(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "write")
            .is_some_and(|(_, value)| value == "true")
    })
}

async fn connect(state: &AppState) -> Response<Body> {
    match state.run("connect", |bridge| bridge.connect()).await {
        Ok(info) => json(
            StatusCode::OK,
            &Connected {
                message: CONNECTED,
                filename: &info.filename,
                session_id: info.session_id.to_string(),
            },
        ),
        Err(e) => failure(CONNECT_FAILED, &e),
    }
}

async fn read_samples(state: &AppState, write: bool) -> Response<Body> {
    match state.run("readsamples", move |bridge| bridge.sample(write)).await {
        Ok(reading) => json(StatusCode::OK, &reading.response()),
        Err(e) => failure(INTERNAL_ERROR, &e),
    }
}

async fn tare_encoder(state: &AppState) -> Response<Body> {
    match state.run("tareheiden", |bridge| bridge.tare_encoder()).await {
        Ok(_) => json(StatusCode::OK, &Message { message: ENCODER_TARED }),
        Err(e) => failure(INTERNAL_ERROR, &e),
    }
}

async fn tare_load_cell(state: &AppState) -> Response<Body> {
    match state.run("tareloadcell", |bridge| bridge.tare_load_cell()).await {
        Ok(ConfigWriteResult::Ok) => json(StatusCode::OK, &Message { message: LOAD_CELL_TARED }),
        Ok(ConfigWriteResult::Unsuccessful) => json(
            StatusCode::OK,
            &Message {
                message: LOAD_CELL_TARE_REJECTED,
            },
        ),
        Err(e) => failure(INTERNAL_ERROR, &e),
    }
}

async fn disconnect(state: &AppState) -> Response<Body> {
    match state.run("disconnect", |bridge| bridge.disconnect()).await {
        Ok(()) => json(StatusCode::OK, &Message { message: DISCONNECTED }),
        Err(e) => failure(DISCONNECT_FAILED, &e),
    }
}

async fn status(state: &AppState) -> Response<Body> {
    match state.status().await {
        Ok(status) => json(StatusCode::OK, &status),
        Err(e) => failure(INTERNAL_ERROR, &e),
    }
}

fn failure(message: &str, err: &CallError) -> Response<Body> {
    error!(error = %err, kind = err.kind(), "Request failed");
    json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &Failure {
            message,
            kind: err.kind(),
            step: err.step_index(),
            device: err.device(),
        },
    )
}

fn method_not_allowed() -> Response<Body> {
    let mut response = json(
        StatusCode::METHOD_NOT_ALLOWED,
        &Message {
            message: "Method Not Allowed",
        },
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, OPTIONS"));
    response
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = respond(status, Body::from(bytes));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            error!(error = %e, "Response serialization failed");
            respond(StatusCode::INTERNAL_SERVER_ERROR, Body::empty())
        }
    }
}

fn respond(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}
