// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Routes provider webhooks into intake, and exposes the internal dispatch
//! trigger plus an unauthenticated liveness endpoint.

pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use courier_core::CourierError;

pub use state::AppState;

/// Build the full route table over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/email/events", post(routes::email::post_email_events))
        .route(
            "/webhooks/email/inbound/{route_secret}",
            post(routes::email::post_email_inbound),
        )
        .route("/webhooks/sms", post(routes::sms::post_sms))
        .route("/internal/dispatch", post(routes::internal::post_dispatch))
        .route("/health", get(routes::internal::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start_server(host: &str, port: u16, state: AppState) -> Result<(), CourierError> {
    let app = router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Internal(format!("failed to bind to {addr}: {e}")))?;

    info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| CourierError::Internal(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use courier_config::model::CourierConfig;
    use courier_core::{
        Channel, ConsentStatus, MessageStatus, NoopSender, SenderRegistry, Tenant,
    };
    use courier_intake::resolver::{record_inbound_email, InboundEmail};
    use courier_storage::queries::{messages, preferences, tenants};
    use courier_storage::Database;
    use courier_verify::email::sign_email;
    use courier_verify::sms::sign_sms;

    const SIGNING_KEY: &str = "email-sign-key";
    const SMS_TOKEN: &str = "sms-auth-token";
    const DISPATCH_SECRET: &str = "dispatch-secret";

    async fn setup() -> (Router, Database, Tenant, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let tenant = Tenant {
            id: "t-1".into(),
            name: "Tenant".into(),
            email_from_address: Some("Tenant <hello@mg.t-1.test>".into()),
            email_api_key: Some("key".into()),
            email_route_secret: Some("route-secret-1".into()),
            sms_from_number: Some("+15550100001".into()),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        tenants::create_tenant(&db, &tenant).await.unwrap();

        let mut config = CourierConfig::default();
        config.webhooks.email_signing_key = Some(SIGNING_KEY.into());
        config.webhooks.sms_auth_token = Some(SMS_TOKEN.into());
        config.webhooks.internal_dispatch_secret = Some(DISPATCH_SECRET.into());
        config.storage.attachments_dir = dir
            .path()
            .join("attachments")
            .to_string_lossy()
            .into_owned();

        let mut senders = SenderRegistry::new();
        senders.register(Channel::Email, Arc::new(NoopSender));
        senders.register(Channel::Sms, Arc::new(NoopSender));
        senders.register(Channel::InApp, Arc::new(NoopSender));

        let app = router(AppState::new(db.clone(), config, senders));
        (app, db, tenant, dir)
    }

    fn signed_event(message_id: &str, event: &str) -> serde_json::Value {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let token = "tok-1";
        serde_json::json!({
            "signature": {
                "timestamp": timestamp,
                "token": token,
                "signature": sign_email(SIGNING_KEY, &timestamp, token),
            },
            "event-data": {
                "event": event,
                "user-variables": { "nc_message_id": message_id },
            },
        })
    }

    async fn post_json(app: &Router, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    async fn seed_message(db: &Database, tenant: &Tenant) -> String {
        let (message, _, _) = record_inbound_email(
            db,
            tenant,
            &InboundEmail {
                from: "kim@example.com".into(),
                recipient: "inbound@mg.t-1.test".into(),
                subject: Some("Hi".into()),
                body_text: "hello".into(),
                body_html: None,
                provider_message_id: None,
            },
        )
        .await
        .unwrap();
        message.id
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _db, _tenant, _dir) = setup().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn delivered_event_marks_the_message() {
        let (app, db, tenant, _dir) = setup().await;
        let message_id = seed_message(&db, &tenant).await;

        let (status, body) =
            post_json(&app, "/webhooks/email/events", signed_event(&message_id, "delivered")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["processed"], 1);

        let message = messages::get_message(&db, &message_id).await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Delivered);
        assert!(message.delivered_at.is_some());
        assert_eq!(messages::count_events(&db, &message_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn uncorrelated_event_is_acknowledged_without_work() {
        let (app, _db, _tenant, _dir) = setup().await;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let body = serde_json::json!({
            "signature": {
                "timestamp": timestamp,
                "token": "tok",
                "signature": sign_email(SIGNING_KEY, &timestamp, "tok"),
            },
            "event-data": { "event": "delivered", "user-variables": {} },
        });
        let (status, body) = post_json(&app, "/webhooks/email/events", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed"], 0);
    }

    #[tokio::test]
    async fn tampered_event_signature_is_forbidden() {
        let (app, db, tenant, _dir) = setup().await;
        let message_id = seed_message(&db, &tenant).await;
        let mut event = signed_event(&message_id, "delivered");
        event["signature"]["signature"] = serde_json::Value::String("00".repeat(32));

        let (status, _) = post_json(&app, "/webhooks/email/events", event).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn stale_event_timestamp_is_forbidden() {
        let (app, db, tenant, _dir) = setup().await;
        let message_id = seed_message(&db, &tenant).await;
        let timestamp = (chrono::Utc::now().timestamp() - 2000).to_string();
        let body = serde_json::json!({
            "signature": {
                "timestamp": timestamp,
                "token": "tok",
                "signature": sign_email(SIGNING_KEY, &timestamp, "tok"),
            },
            "event-data": {
                "event": "delivered",
                "user-variables": { "nc_message_id": message_id },
            },
        });
        let (status, _) = post_json(&app, "/webhooks/email/events", body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    async fn post_sms_form(app: &Router, params: &BTreeMap<String, String>) -> (StatusCode, serde_json::Value) {
        let url = "http://localhost/webhooks/sms";
        let signature = sign_sms(SMS_TOKEN, url, params);
        let body = params
            .iter()
            .map(|(k, v)| format!("{k}={}", v.replace('+', "%2B").replace(' ', "%20")))
            .collect::<Vec<_>>()
            .join("&");
        let response = app
            .clone()
            .oneshot(
                Request::post("/webhooks/sms")
                    .header("host", "localhost")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .header("x-twilio-signature", signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    fn sms_params(to: &str, body: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("To".to_string(), to.to_string()),
            ("From".to_string(), "+15551230000".to_string()),
            ("Body".to_string(), body.to_string()),
            ("MessageSid".to_string(), "SM1".to_string()),
        ])
    }

    #[tokio::test]
    async fn stop_keyword_opts_the_sender_out() {
        let (app, db, tenant, _dir) = setup().await;
        let (status, body) = post_sms_form(&app, &sms_params("+15550100001", "STOP")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["opted_out"], true);

        let contact = courier_storage::queries::contacts::find_by_phone(
            &db,
            &tenant.id,
            "+15551230000",
        )
        .await
        .unwrap()
        .unwrap();
        let pref = preferences::get_preference(&db, &tenant.id, &contact.id, Channel::Sms)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.consent_status, ConsentStatus::OptedOut);
        assert_eq!(pref.consent_source, "sms_stop");

        // The STOP message itself is still recorded.
        let message = messages::get_message(&db, body["message_id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.status, MessageStatus::Received);
    }

    #[tokio::test]
    async fn sms_sid_is_accepted_when_message_sid_is_absent() {
        let (app, db, _tenant, _dir) = setup().await;
        let mut params = sms_params("+15550100001", "hi there");
        params.remove("MessageSid");
        params.insert("SmsSid".to_string(), "SM9".to_string());

        let (status, body) = post_sms_form(&app, &params).await;
        assert_eq!(status, StatusCode::OK);

        let message = messages::get_message(&db, body["message_id"].as_str().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.provider_message_id.as_deref(), Some("SM9"));
    }

    #[tokio::test]
    async fn unmapped_to_number_is_not_found() {
        let (app, _db, _tenant, _dir) = setup().await;
        let (status, _) = post_sms_form(&app, &sms_params("+15559999999", "hi")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sms_without_signature_header_is_forbidden() {
        let (app, _db, _tenant, _dir) = setup().await;
        let response = app
            .oneshot(
                Request::post("/webhooks/sms")
                    .header("host", "localhost")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("To=%2B15550100001&From=%2B15551230000&Body=hi"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn dispatch_requires_the_shared_secret() {
        let (app, _db, _tenant, _dir) = setup().await;
        let response = app
            .clone()
            .oneshot(
                Request::post("/internal/dispatch")
                    .header("x-courier-internal-secret", "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(
                Request::post("/internal/dispatch?limit=5")
                    .header("x-courier-internal-secret", DISPATCH_SECRET)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["sent"], 0);
        assert_eq!(body["failed"], 0);
    }
}
