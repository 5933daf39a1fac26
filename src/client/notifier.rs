use async_trait::async_trait;

use url::Url;

use crate::domain::{ContactId, EmailAddress};

use super::{Email, EmailClient};

const SUBJECT: &str = "Confirm your subscription";

/// A verification email could not be sent
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to build verification link: {0}")]
    Link(#[from] url::ParseError),
    #[error("Failed to send email: {0}")]
    Send(#[from] reqwest::Error),
}

/// Delivers verification links to prospective subscribers
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_email(
        &self,
        email: &EmailAddress,
        id: &ContactId,
    ) -> Result<(), NotifyError>;
}

/// Sends the fixed verification template through an [`EmailClient`]
#[derive(Debug)]
pub struct VerificationNotifier {
    email_client: EmailClient,
    api_url: Url,
    verify_path: String,
}

impl VerificationNotifier {
    /// `api_url` must end with a slash, links are built relative to it
    pub fn new(email_client: EmailClient, api_url: Url, verify_path: impl Into<String>) -> Self {
        Self {
            email_client,
            api_url,
            verify_path: verify_path.into(),
        }
    }

    /// `<api_url><verify_path>/?email=<email>&id=<id>`
    pub fn verification_link(&self, email: &EmailAddress, id: &ContactId) -> Result<Url, NotifyError> {
        let segment = format!("{}/", self.verify_path.trim_matches('/'));
        let mut link = self.api_url.join(&segment)?;
        link.query_pairs_mut()
            .append_pair("email", email.as_ref())
            .append_pair("id", id.as_ref());
        Ok(link)
    }
}

#[async_trait]
impl Notifier for VerificationNotifier {
    #[tracing::instrument(name = "Send verification email", skip(self))]
    async fn send_verification_email(
        &self,
        email: &EmailAddress,
        id: &ContactId,
    ) -> Result<(), NotifyError> {
        let link = self.verification_link(email, id)?;
        let email = build_verification_email(email.clone(), &link);

        self.email_client.send(&email).await?;
        Ok(())
    }
}

fn build_verification_email(recipient: EmailAddress, link: &Url) -> Email {
    let html_body = format!(
        "<p>Hello! You're receiving this email because you requested a subscription to my list.</p>\
         <p>To complete your subscription, please click this link to finish signing up:</p>\
         <p><a class=\"ulink\" href=\"{}\" target=\"_blank\">Confirm subscription</a>.</p>\
         <p>If you did not request this email, you can safely ignore it. \
         Your email address has not yet been added to my list.</p>",
        link
    );
    let text_body = format!(
        "Hello! You're receiving this email because you requested a subscription to my list.\n\n\
         To complete your subscription, please visit this link to finish signing up.\n\n\
         {}\n\n\
         If you did not request this email, you can safely ignore it. \
         Your email address has not yet been added to my list.",
        link
    );

    Email {
        recipient,
        subject: SUBJECT.into(),
        html_body,
        text_body,
    }
}
