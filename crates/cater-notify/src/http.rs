//! HTTP delivery to the external notification service.
//!
//! `POST {base_url}/notifications` with a JSON [`Notification`] body and a
//! bearer token. Any 2xx is success. One attempt per call.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;

use crate::config::{ConfigError, NotifierConfig};
use crate::error::NotifyError;
use crate::{Notification, Notifier};

const ENDPOINT: &str = "POST /notifications";

/// Notifier backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpNotifier {
    /// Build the client from configuration.
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|_| ConfigError::MissingToken)?,
        );
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| NotifyError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            endpoint: config.endpoint()?,
        })
    }
}

impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Http {
                endpoint: ENDPOINT.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                endpoint: ENDPOINT.into(),
                status,
                body,
            });
        }

        tracing::debug!(
            invoice_id = %notification.invoice_id,
            kind = %notification.kind,
            "notification accepted by service"
        );
        Ok(())
    }
}
