use std::collections::HashMap;

use axum::{Json, Router, extract::Query, response::Html, routing::get};
use serde_json::{Value, json};
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

/// Code handed out by the fake SMS endpoint.
pub const PHONE_CODE: &str = "4821";

const INDEX_HTML: &str = include_str!("urban_routes.html");

pub struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A stand-in for the Urban Routes app, exposing the same element ids and SMS endpoint.
pub struct FixtureApp {
    pub url: Url,
    _server: AbortOnDrop<()>,
}

impl FixtureApp {
    /// Variant of the app where the card link button never becomes clickable.
    pub fn card_declined_url(&self) -> Url {
        self.url.join("card-declined").expect("valid url")
    }

    /// Variant of the app whose destination field keeps only the first 8 characters.
    pub fn short_destination_url(&self) -> Url {
        self.url.join("short-destination").expect("valid url")
    }
}

pub async fn start_fixture_app() -> FixtureApp {
    let router = Router::new()
        .route("/", get(index))
        .route("/card-declined", get(card_declined))
        .route("/short-destination", get(short_destination))
        .route("/api/v1/number", get(issue_phone_code));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("TcpListener");
    let port = listener.local_addr().expect("local address").port();

    let server_jh = tokio::spawn(async move {
        tracing::info!("Serving fixture app...");
        axum::serve(listener, router)
            .await
            .expect("Server to start successfully");
    });

    let url = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("valid url");
    tracing::info!(available_at = %url, "Fixture app started.");
    FixtureApp {
        url,
        _server: AbortOnDrop(server_jh),
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn card_declined() -> Html<String> {
    Html(INDEX_HTML.replace(
        "byId('link').disabled = !filled;",
        "byId('link').disabled = true;",
    ))
}

async fn short_destination() -> Html<String> {
    Html(INDEX_HTML.replace(
        r#"<input id="to" placeholder="Hasta">"#,
        r#"<input id="to" placeholder="Hasta" maxlength="8">"#,
    ))
}

async fn issue_phone_code(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    tracing::info!(number = ?params.get("number"), "Issuing phone code.");
    Json(json!({ "code": PHONE_CODE }))
}
