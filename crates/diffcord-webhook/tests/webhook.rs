use std::future::Ready;
use std::io;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use diffcord_webhook::{BoxError, Vote, Webhook, WebhookOptions};
use tower::ServiceExt;

const VOTE_JSON: &str = r#"{
    "vote_id": "1183456",
    "user_id": "456029823537903361",
    "bot_id": "1042810329416409138",
    "since_vote": 0,
    "rewarded": false,
    "test": true,
    "monthly_votes": 7
}"#;

fn expected_vote() -> Vote {
    Vote {
        vote_id: "1183456".into(),
        user_id: "456029823537903361".into(),
        bot_id: "1042810329416409138".into(),
        since_vote: Some(0),
        rewarded: false,
        test: true,
        monthly_votes: 7,
    }
}

type Seen = Arc<Mutex<Vec<Vote>>>;

fn recording_app(webhook: Webhook) -> (Router, Seen) {
    let seen: Seen = Arc::default();
    let recorded = seen.clone();
    let app = Router::new().route(
        "/diffcordwebhook",
        webhook.listener(move |vote: Vote| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(vote);
                Ok::<(), BoxError>(())
            }
        }),
    );
    (app, seen)
}

fn delivery(auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post("/diffcordwebhook").header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn valid_delivery_reaches_handler_once() {
    let (app, seen) = recording_app(Webhook::new(Some("S".into())));

    let (status, body) = send(app, delivery(Some("S"), VOTE_JSON)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(*seen.lock().unwrap(), vec![expected_vote()]);
}

#[tokio::test]
async fn wrong_secret_is_rejected_before_handler() {
    let (app, seen) = recording_app(Webhook::new(Some("S".into())));

    let (status, body) = send(app, delivery(Some("wrong"), VOTE_JSON)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Unauthorized");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_header_is_accepted_by_default() {
    let (app, seen) = recording_app(Webhook::new(Some("S".into())));

    let (status, _) = send(app, delivery(None, VOTE_JSON)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_header_is_rejected_when_required() {
    let webhook =
        Webhook::with_options(Some("S".into()), WebhookOptions { require_auth: true }).unwrap();
    let (app, seen) = recording_app(webhook);

    let (status, _) = send(app, delivery(None, VOTE_JSON)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn no_secret_accepts_any_header() {
    let (app, seen) = recording_app(Webhook::new(None));

    let (status, _) = send(app, delivery(Some("anything"), VOTE_JSON)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (app, seen) = recording_app(Webhook::new(Some("S".into())));

    let (status, body) = send(app, delivery(Some("S"), "{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid vote payload");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn body_missing_vote_fields_is_bad_request() {
    let (app, seen) = recording_app(Webhook::new(None));

    let (status, _) = send(app, delivery(None, r#"{"vote_id":"1"}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn handler_error_becomes_500() {
    let webhook = Webhook::new(Some("S".into()));
    let app = Router::new().route(
        "/diffcordwebhook",
        webhook.listener(|_vote: Vote| async {
            Err::<(), io::Error>(io::Error::other("database unavailable"))
        }),
    );

    let (status, body) = send(app, delivery(Some("S"), VOTE_JSON)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error processing vote");
}

#[tokio::test]
async fn handler_panic_becomes_500() {
    let webhook = Webhook::new(None);
    let app = Router::new().route(
        "/diffcordwebhook",
        webhook.listener(|_vote: Vote| async {
            if true {
                panic!("handler bug");
            }
            Ok::<(), BoxError>(())
        }),
    );

    let (status, _) = send(app, delivery(None, VOTE_JSON)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

fn reject_before_dispatch(_vote: Vote) -> Ready<Result<(), BoxError>> {
    panic!("handler bug before returning future");
}

#[tokio::test]
async fn handler_panic_before_future_becomes_500() {
    let app = Router::new().route(
        "/diffcordwebhook",
        Webhook::new(None).listener(reject_before_dispatch),
    );

    let (status, body) = send(app, delivery(None, VOTE_JSON)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error processing vote");
}

#[tokio::test]
async fn listener_works_with_router_state() {
    #[derive(Clone)]
    struct AppState;

    let webhook = Webhook::new(None);
    let app: Router = Router::new()
        .route(
            "/diffcordwebhook",
            webhook.listener(|_vote: Vote| async { Ok::<(), BoxError>(()) }),
        )
        .with_state(AppState);

    let (status, _) = send(app, delivery(None, VOTE_JSON)).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn process_reports_outcome_directly() {
    let webhook = Webhook::new(Some("S".into()));
    let handler = |_vote: Vote| async { Ok::<(), BoxError>(()) };

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(header::AUTHORIZATION, "S".parse().unwrap());

    let outcome = webhook.process(&handler, &headers, VOTE_JSON.as_bytes()).await;
    assert_eq!(outcome.status(), StatusCode::OK);

    let outcome = webhook.process(&handler, &headers, b"[]").await;
    assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
}
