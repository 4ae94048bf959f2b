use std::time;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::dispatcher::EmailTransport;
use crate::domain::EmailAddress;
use crate::templates::EmailMessage;

/// Email client data
pub struct EmailClient {
    http_client: Client,
    base_url: Url,
    sender: EmailAddress,
    sender_name: String,
    authorization_token: SecretString,
}

/// Body of a request to the email API
#[derive(serde::Serialize)]
struct SendEmailRequest<'a> {
    from: String,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: Url,
        sender: EmailAddress,
        sender_name: String,
        authorization_token: SecretString,
        timeout: time::Duration,
    ) -> reqwest::Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            sender,
            sender_name,
            authorization_token,
        })
    }

    /// Sender, formatted as `Name <address>`
    fn from_header(&self) -> String {
        format!("{} <{}>", self.sender_name, self.sender)
    }

    /// Send an email using Resend's REST API
    /// <https://resend.com/docs/api-reference/emails/send-email>
    pub async fn send_email(
        &self,
        recipient: &EmailAddress,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> anyhow::Result<()> {
        let url = self
            .base_url
            .join("/emails")
            .context("Failed to build the email API URL")?;
        let request_body = SendEmailRequest {
            from: self.from_header(),
            to: [recipient.as_ref()],
            subject,
            html: html_content,
            text: text_content,
        };
        self.http_client
            .post(url)
            .bearer_auth(self.authorization_token.expose_secret())
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl EmailTransport for EmailClient {
    async fn send(&self, recipient: &EmailAddress, message: &EmailMessage) -> anyhow::Result<()> {
        self.send_email(
            recipient,
            &message.subject,
            &message.html_content,
            &message.text_content,
        )
        .await
    }
}
