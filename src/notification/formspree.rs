//! A notifier that submits messages to a Formspree form.

use crate::config::{FormspreeConfig, HttpConfig};
use crate::core::{Message, Notifier};
use crate::http::build_client;
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, instrument};

/// The form submission body.
#[derive(Debug, Serialize, PartialEq)]
pub struct FormspreePayload<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub message: &'a str,
}

/// Posts each message to `{base_url}/f/{form_id}`.
pub struct FormspreeNotifier {
    client: reqwest::Client,
    endpoint: String,
    sender_name: String,
    sender_email: String,
}

impl FormspreeNotifier {
    /// Creates a new `FormspreeNotifier` for the given form.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        form_id: &str,
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/f/{}", base_url.trim_end_matches('/'), form_id),
            sender_name: sender_name.into(),
            sender_email: sender_email.into(),
        }
    }

    /// Builds a notifier from configuration.
    ///
    /// # Returns
    /// * `Ok(None)` if no form id is configured
    /// * `Err` if the HTTP client cannot be built
    pub fn from_config(config: &FormspreeConfig, http: &HttpConfig) -> anyhow::Result<Option<Self>> {
        let Some(form_id) = config.form_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            return Ok(None);
        };
        let client = build_client(http).context("failed to build Formspree HTTP client")?;
        Ok(Some(Self::new(
            client,
            &config.base_url,
            form_id,
            config.sender_name.clone(),
            config.sender_email.clone(),
        )))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn payload<'a>(&'a self, message: &'a Message) -> FormspreePayload<'a> {
        FormspreePayload {
            name: &self.sender_name,
            email: &self.sender_email,
            message: &message.content,
        }
    }
}

#[async_trait]
impl Notifier for FormspreeNotifier {
    fn name(&self) -> &str {
        "formspree"
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn notify(&self, message: &Message) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request to Formspree failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Formspree rejected the submission");
            anyhow::bail!("Formspree rejected the submission: status {}, body: {}", status, body);
        }

        info!("Submitted message to Formspree.");
        Ok(())
    }
}
