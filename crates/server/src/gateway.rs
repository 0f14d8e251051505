//! Notification gateways selected by `[notifications] mode`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rfqdesk_core::config::{NotificationMode, NotificationsConfig};
use rfqdesk_core::invitation::{NotificationError, NotificationGateway, OutboundMessage};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("notifications.webhook_url is required in webhook mode")]
    MissingWebhookUrl,
    #[error("failed to build webhook client: {0}")]
    Client(#[source] reqwest::Error),
}

pub fn build_gateway(
    config: &NotificationsConfig,
) -> Result<Arc<dyn NotificationGateway>, GatewayError> {
    match config.mode {
        NotificationMode::Log => Ok(Arc::new(LogOnlyGateway)),
        NotificationMode::Webhook => {
            let url = config.webhook_url.clone().ok_or(GatewayError::MissingWebhookUrl)?;
            let gateway = WebhookGateway::new(
                url,
                config.webhook_token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(gateway))
        }
    }
}

/// Writes each invitation to the log and reports it as delivered.
#[derive(Clone, Debug, Default)]
pub struct LogOnlyGateway;

#[async_trait]
impl NotificationGateway for LogOnlyGateway {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        info!(
            event_name = "notification.logged",
            recipient = %message.recipient_email,
            subject = %message.subject,
            link = %message.link,
            "invitation logged instead of sent"
        );
        Ok(())
    }
}

/// POSTs each message as JSON to a relay endpoint. Any non-2xx status counts
/// as a rejection for that recipient.
pub struct WebhookGateway {
    client: Client,
    url: String,
    token: Option<SecretString>,
}

impl WebhookGateway {
    pub fn new(
        url: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build().map_err(GatewayError::Client)?;
        Ok(Self { client, url: url.into(), token })
    }
}

#[async_trait]
impl NotificationGateway for WebhookGateway {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        let mut request = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| NotificationError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected {
                recipient: message.recipient_email.clone(),
                reason: format!("webhook returned {}", response.status()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use rfqdesk_core::invitation::{NotificationError, NotificationGateway, OutboundMessage};
    use secrecy::SecretString;

    use super::WebhookGateway;

    type Received = Arc<Mutex<Vec<(Option<String>, OutboundMessage)>>>;

    async fn relay(
        State(received): State<Received>,
        headers: HeaderMap,
        Json(message): Json<OutboundMessage>,
    ) -> StatusCode {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let reject = message.recipient_email.starts_with("bounce");
        received.lock().expect("lock").push((auth, message));
        if reject {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::ACCEPTED
        }
    }

    async fn spawn_relay() -> (String, Received) {
        let received = Received::default();
        let app = Router::new().route("/relay", post(relay)).with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
        let address = listener.local_addr().expect("relay address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{address}/relay"), received)
    }

    fn message(recipient: &str) -> OutboundMessage {
        OutboundMessage {
            recipient_email: recipient.to_string(),
            subject: "Request for quotation RFQ-00001 - Tower A".to_string(),
            body: "Materials (1):".to_string(),
            link: "http://localhost:8080/rfq/RFQ-1/respond".to_string(),
        }
    }

    #[tokio::test]
    async fn webhook_posts_message_with_bearer_token() {
        let (url, received) = spawn_relay().await;
        let gateway = WebhookGateway::new(
            url,
            Some(SecretString::from("relay-token".to_string())),
            Duration::from_secs(5),
        )
        .expect("gateway");

        gateway.deliver(&message("quotes@timberworks.in")).await.expect("deliver");

        let received = received.lock().expect("lock").clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0.as_deref(), Some("Bearer relay-token"));
        assert_eq!(received[0].1, message("quotes@timberworks.in"));
    }

    #[tokio::test]
    async fn webhook_non_success_status_is_a_rejection() {
        let (url, _) = spawn_relay().await;
        let gateway = WebhookGateway::new(url, None, Duration::from_secs(5)).expect("gateway");

        let error = gateway.deliver(&message("bounce@steel.in")).await.expect_err("rejected");

        assert!(matches!(
            error,
            NotificationError::Rejected { ref recipient, ref reason }
                if recipient == "bounce@steel.in" && reason.contains("422")
        ));
    }
}
