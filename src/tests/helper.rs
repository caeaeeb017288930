use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use axum::response::Response;
use http_body_util::BodyExt;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use serde_json::Map;
use serde_json::Value;
use tower::Service;
use uuid::Uuid;

use crate::config::Config;
use crate::create_router;
use crate::setup_app;
use crate::storage::Storage;

/// Test helper version of Destination struct
#[derive(Debug)]
pub struct Destination {
    pub id: Uuid,
    pub url: String,
    pub description: String,
    pub num_args: u64,
    pub is_fallback: bool,
    pub is_default_fallback: bool,
    pub aliases: Vec<String>,
}

/// Test helper version of a listing entry
#[derive(Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub url: String,
    pub description: String,
    pub aliases: Vec<String>,
}

/// Error response
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
}

/// Setup the Hare app with memory storage and the bootstrapped destinations
pub async fn setup_test_app() -> Router {
    let config = Config::from_vars(|_| None).unwrap();

    setup_app(&config).await.unwrap()
}

/// Setup the Hare app with empty memory storage, without a default fallback
pub async fn setup_empty_test_app() -> Router {
    let config = Config::from_vars(|name| (name == "BOOTSTRAP").then(|| "false".to_string()))
        .unwrap();

    setup_app(&config).await.unwrap()
}

/// Setup the Hare app on top of the given storage, without bootstrapping
pub fn setup_test_app_with_storage<S: Storage>(storage: S) -> Router {
    create_router(storage)
}

async fn call(app: &mut Router, request: Request<Body>) -> (StatusCode, Option<String>, Bytes) {
    let response: Response = app.call(request).await.unwrap();

    let status_code = response.status();
    let location = response
        .headers()
        .get(LOCATION)
        .map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, location, body)
}

async fn call_with_json(
    app: &mut Router,
    method: Method,
    uri: &str,
    payload: &Map<String, Value>,
) -> (StatusCode, Option<String>, Bytes) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap();

    call(app, request).await
}

async fn call_without_body(
    app: &mut Router,
    method: Method,
    uri: &str,
) -> (StatusCode, Option<String>, Bytes) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    call(app, request).await
}

/// Call the root with an optional query and fallback in the query string
pub async fn root(
    app: &mut Router,
    query: Option<&str>,
    fallback: Option<&str>,
) -> (StatusCode, Option<String>, Option<Error>) {
    let mut parameters = Vec::new();

    if let Some(query) = query {
        parameters.push(format!("query={}", utf8_percent_encode(query, NON_ALPHANUMERIC)));
    }

    if let Some(fallback) = fallback {
        parameters.push(format!(
            "fallback={}",
            utf8_percent_encode(fallback, NON_ALPHANUMERIC)
        ));
    }

    root_with_raw_query(app, &parameters.join("&")).await
}

/// Call the root with a raw query string
pub async fn root_with_raw_query(
    app: &mut Router,
    query_string: &str,
) -> (StatusCode, Option<String>, Option<Error>) {
    let (status_code, location, body) =
        call_without_body(app, Method::GET, &format!("/?{query_string}")).await;

    (status_code, location, maybe_error(status_code, &body))
}

/// Call the root with the query and fallback in a JSON body
pub async fn root_with_form(
    app: &mut Router,
    query: &str,
    fallback: Option<&str>,
) -> (StatusCode, Option<String>, Option<Error>) {
    let mut payload = Map::new();
    payload.insert("query".to_string(), Value::String(query.to_string()));

    if let Some(fallback) = fallback {
        payload.insert("fallback".to_string(), Value::String(fallback.to_string()));
    }

    let (status_code, location, body) = call_with_json(app, Method::POST, "/", &payload).await;

    (status_code, location, maybe_error(status_code, &body))
}

pub async fn list(app: &mut Router) -> (StatusCode, Vec<ListEntry>) {
    let (status_code, _, body) = call_without_body(app, Method::GET, "/list").await;

    let entries = serde_json::from_slice::<Value>(&body[..])
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| ListEntry {
            url: entry["url"].as_str().map(ToString::to_string).unwrap(),
            description: entry["description"]
                .as_str()
                .map(ToString::to_string)
                .unwrap(),
            aliases: value_to_strings(&entry["aliases"]),
        })
        .collect();

    (status_code, entries)
}

pub async fn maybe_create_destination_with_payload(
    app: &mut Router,
    payload: &Map<String, Value>,
) -> (StatusCode, Option<Destination>, Option<Error>) {
    let (status_code, _, body) =
        call_with_json(app, Method::POST, "/api/destinations", payload).await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_destination(&body))
        } else {
            None
        },
        maybe_error(status_code, &body),
    )
}

pub async fn maybe_create_destination(
    app: &mut Router,
    url: &str,
    aliases: &[&str],
    is_fallback: bool,
    is_default_fallback: bool,
) -> (StatusCode, Option<Destination>, Option<Error>) {
    let mut payload = Map::new();
    payload.insert("url".to_string(), Value::String(url.to_string()));
    payload.insert("description".to_string(), Value::String(url.to_string()));
    payload.insert(
        "aliases".to_string(),
        Value::Array(
            aliases
                .iter()
                .map(|alias| Value::String((*alias).to_string()))
                .collect(),
        ),
    );
    payload.insert("isFallback".to_string(), Value::Bool(is_fallback));
    payload.insert(
        "isDefaultFallback".to_string(),
        Value::Bool(is_default_fallback),
    );

    maybe_create_destination_with_payload(app, &payload).await
}

pub async fn create_destination(app: &mut Router, url: &str, aliases: &[&str]) -> Destination {
    let (status_code, destination, error) =
        maybe_create_destination(app, url, aliases, false, false).await;
    assert_eq!(StatusCode::CREATED, status_code, "{error:?}");

    destination.unwrap()
}

pub async fn maybe_create_destination_with_raw_body(
    app: &mut Router,
    body: &'static str,
    include_content_type: bool,
) -> (StatusCode, Option<Destination>, Option<Error>) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/destinations");

    if include_content_type {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }

    let request = builder.body(Body::from(body.as_bytes())).unwrap();

    let (status_code, _, body) = call(app, request).await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_destination(&body))
        } else {
            None
        },
        maybe_error(status_code, &body),
    )
}

pub async fn single_destination(
    app: &mut Router,
    id: &str,
) -> (StatusCode, Option<Destination>, Option<Error>) {
    let (status_code, _, body) =
        call_without_body(app, Method::GET, &format!("/api/destinations/{id}")).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_destination(&body))
        } else {
            None
        },
        maybe_error(status_code, &body),
    )
}

pub async fn list_destinations(app: &mut Router) -> (StatusCode, Vec<Destination>) {
    let (status_code, _, body) = call_without_body(app, Method::GET, "/api/destinations").await;

    (status_code, get_destinations(&body))
}

pub async fn maybe_delete_destination(
    app: &mut Router,
    id: &Uuid,
) -> (StatusCode, Option<Error>) {
    let (status_code, _, body) =
        call_without_body(app, Method::DELETE, &format!("/api/destinations/{id}")).await;

    (status_code, maybe_error(status_code, &body))
}

pub async fn clear_default_fallback(app: &mut Router) -> (StatusCode, u64) {
    let (status_code, _, body) =
        call_without_body(app, Method::DELETE, "/api/default-fallback").await;

    let cleared = serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]["cleared"]
        .as_u64()
        .unwrap();

    (status_code, cleared)
}

/// Call any endpoint without a body, only the status and a possible error are of interest
pub async fn maybe_error_without_body(
    app: &mut Router,
    method: Method,
    uri: &str,
) -> (StatusCode, Option<Error>) {
    let (status_code, _, body) = call_without_body(app, method, uri).await;

    (status_code, maybe_error(status_code, &body))
}

pub async fn health(app: &mut Router) -> (StatusCode, String) {
    let (status_code, _, body) = call_without_body(app, Method::GET, "/api/health").await;

    let status = serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]["status"]
        .as_str()
        .map(ToString::to_string)
        .unwrap();

    (status_code, status)
}

fn value_to_strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_str().map(ToString::to_string).unwrap())
        .collect()
}

fn value_to_destination(destination: &Map<String, Value>) -> Destination {
    Destination {
        id: destination["id"]
            .as_str()
            .map(Uuid::parse_str)
            .unwrap()
            .unwrap(),
        url: destination["url"]
            .as_str()
            .map(ToString::to_string)
            .unwrap(),
        description: destination["description"]
            .as_str()
            .map(ToString::to_string)
            .unwrap(),
        num_args: destination["numArgs"].as_u64().unwrap(),
        is_fallback: destination["isFallback"].as_bool().unwrap(),
        is_default_fallback: destination["isDefaultFallback"].as_bool().unwrap(),
        aliases: value_to_strings(&destination["aliases"]),
    }
}

fn get_destination(body: &Bytes) -> Destination {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_destination)
        .unwrap()
}

fn get_destinations(body: &Bytes) -> Vec<Destination> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_destination)
        .collect()
}

fn value_to_error(error: &Map<String, Value>) -> Error {
    Error {
        error: error["error"].as_str().map(ToString::to_string).unwrap(),
        description: error
            .get("description")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    }
}

/// Errors have a JSON body, everything else is ignored
fn maybe_error(status_code: StatusCode, body: &Bytes) -> Option<Error> {
    if status_code.is_client_error() || status_code.is_server_error() {
        serde_json::from_slice::<Value>(&body[..])
            .unwrap()
            .as_object()
            .map(value_to_error)
    } else {
        None
    }
}
