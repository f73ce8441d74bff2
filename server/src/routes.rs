//! HTTP routing for the scalar API
//!
//! Parses requests, calls into the core handlers and maps `ApiError`s onto
//! JSON error responses.

use std::convert::Infallible;
use std::net::SocketAddr;

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{info, warn};

use scalar_bridge_core::config::Config;
use scalar_bridge_core::error::{ApiError, ErrorResponse};
use scalar_bridge_core::platform::HttpClient;
use scalar_bridge_core::scalar::{account, register, widget};
use scalar_bridge_core::token::SessionTokenCodec;

/// Largest request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

pub type HyperResponse = Response<Full<Bytes>>;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub codec: SessionTokenCodec,
    pub http: Box<dyn HttpClient>,
}

impl AppState {
    pub fn new(config: Config, http: Box<dyn HttpClient>) -> Self {
        let codec = SessionTokenCodec::new(&config.signing_key);
        Self { config, codec, http }
    }
}

/// Entry point for hyper: log, buffer the body, route
pub async fn handle_request(
    req: Request<Incoming>,
    remote: SocketAddr,
    state: &AppState,
) -> Result<HyperResponse, Infallible> {
    // Path only: the query string may carry a scalar token.
    info!(remote = %remote, method = %req.method(), path = %req.uri().path(), "request");

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Ok(body_error_response(parts.uri.path())),
    };

    Ok(route_request(Request::from_parts(parts, body), state).await)
}

/// 400 for an unreadable or oversized body, with CORS on API paths
fn body_error_response(path: &str) -> HyperResponse {
    let response = error_response(&ApiError::invalid_request("failed to read request body"));
    if path.starts_with("/api/") {
        with_cors(response)
    } else {
        response
    }
}

pub async fn route_request(req: Request<Bytes>, state: &AppState) -> HyperResponse {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, p) if p.starts_with("/api/") => empty_response(StatusCode::OK),
        (Method::POST, "/api/register") => handle_register(req, state).await,
        (Method::GET, "/api/account") => handle_account(&req, state),
        (_, "/api/widgets/set_assets_state") => empty_response(StatusCode::OK),
        (Method::GET, "/") => return handle_ui(&req, state),
        _ => json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "not_found"})),
    };

    with_cors(response)
}

async fn handle_register(req: Request<Bytes>, state: &AppState) -> HyperResponse {
    let request = match register::RegisterRequest::from_json(req.body()) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    match register::handle(request, &state.config, &state.codec, state.http.as_ref()).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            warn!(error = %e, "registration failed");
            error_response(&e)
        }
    }
}

fn handle_account(req: &Request<Bytes>, state: &AppState) -> HyperResponse {
    let token = scalar_token(req);

    match account::handle(&token, &state.codec) {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(&e),
    }
}

fn handle_ui(req: &Request<Bytes>, state: &AppState) -> HyperResponse {
    let token = scalar_token(req);
    let screen = query_param(req.uri().query().unwrap_or(""), "screen").unwrap_or_default();

    match widget::handle(&token, &screen, &state.config.sticker_url, &state.codec) {
        Ok(html) => {
            let mut response = Response::new(Full::new(Bytes::from(html)));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
            response
        }
        Err(e) => error_response(&e),
    }
}

/// Scalar token from the `scalar_token` query parameter, else a Bearer header
fn scalar_token(req: &Request<Bytes>) -> String {
    if let Some(token) = query_param(req.uri().query().unwrap_or(""), "scalar_token") {
        return token;
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .unwrap_or_default()
}

fn query_param(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn with_cors(mut response: HyperResponse) -> HyperResponse {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    response
}

fn error_response(err: &ApiError) -> HyperResponse {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::from(err);
    json_response(status, &body)
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> HyperResponse {
    let json = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty_response(status: StatusCode) -> HyperResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
