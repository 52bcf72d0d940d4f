//! # HTTP Notifier Wire Contract
//!
//! Runs [`HttpNotifier`] against a wiremock server to pin down the request
//! it sends (path, auth header, JSON body) and how non-2xx answers and slow
//! services surface as errors.

use std::time::Duration;

use cater_core::{Actor, InvoiceId, Timestamp};
use cater_notify::{HttpNotifier, Notification, NotifierConfig, Notifier, NotifyError};
use cater_state::{InvoiceStatus, NotificationKind, RecipientClass};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notifier(server: &MockServer) -> HttpNotifier {
    let config = NotifierConfig::new(&server.uri(), "test-token").expect("config");
    HttpNotifier::new(&config).expect("client")
}

fn approved(invoice_id: InvoiceId) -> Notification {
    Notification {
        invoice_id,
        kind: NotificationKind::EstimateApproved,
        recipient: RecipientClass::Admin,
        status: InvoiceStatus::Approved,
        actor: Actor::Customer,
        created_at: Timestamp::parse("2026-03-01T12:00:00Z").expect("timestamp"),
    }
}

#[tokio::test]
async fn posts_json_with_bearer_token() {
    let server = MockServer::start().await;
    let invoice_id = InvoiceId::new();

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_partial_json(serde_json::json!({
            "invoice_id": invoice_id.to_string(),
            "kind": "estimate_approved",
            "recipient": "admin",
            "status": "approved",
            "actor": "customer",
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server)
        .send(&approved(invoice_id))
        .await
        .expect("send");
}

#[tokio::test]
async fn non_success_status_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = notifier(&server)
        .send(&approved(InvoiceId::new()))
        .await
        .unwrap_err();
    match err {
        NotifyError::Rejected { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn client_timeout_surfaces_as_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = NotifierConfig::new(&server.uri(), "test-token")
        .expect("config")
        .with_timeout(Duration::from_millis(100));
    let err = HttpNotifier::new(&config)
        .expect("client")
        .send(&approved(InvoiceId::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Http { .. }), "{err:?}");
}

#[tokio::test]
async fn base_path_is_preserved() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/v1/notifications"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config =
        NotifierConfig::new(&format!("{}/hooks/v1", server.uri()), "test-token").expect("config");
    HttpNotifier::new(&config)
        .expect("client")
        .send(&approved(InvoiceId::new()))
        .await
        .expect("send");
}
