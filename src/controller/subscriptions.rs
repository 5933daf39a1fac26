use std::sync::Arc;

use serde::Deserialize;

use crate::client::{EmailClient, Notifier, VerificationNotifier};
use crate::domain::{timestamp, ContactId, EmailAddress};
use crate::error::{SubscribeError, SubscribeResult};
use crate::repo::{Contact, ContactStore, DynamoContactStore, InMemoryContactStore};
use crate::settings::{RouteSettings, Settings, StoreBackend};

use super::{InboundRequest, Page, Pages, Redirect};

/// Which flavour of the workflow a deployment runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Subscribe, verify through an emailed link, unsubscribe with email and id.
    /// The table is keyed by email.
    DoubleOptIn,
    /// Subscribe behind a bot check, unsubscribe with the id alone.
    /// The table is keyed by id and no email is sent.
    SingleStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Subscribe,
    Verify,
    Unsubscribe,
}

/// Path segments served by the workflow
#[derive(Debug, Clone)]
pub struct Routes {
    subscribe: String,
    verify: String,
    unsubscribe: String,
}

impl Routes {
    pub fn new(
        subscribe: impl Into<String>,
        verify: impl Into<String>,
        unsubscribe: impl Into<String>,
    ) -> Self {
        let segment = |value: String| value.trim_matches('/').to_string();
        Self {
            subscribe: segment(subscribe.into()),
            verify: segment(verify.into()),
            unsubscribe: segment(unsubscribe.into()),
        }
    }

    fn route(&self, path: &str, policy: Policy) -> Option<Route> {
        if is_segment(path, &self.subscribe) {
            Some(Route::Subscribe)
        } else if policy == Policy::DoubleOptIn && is_segment(path, &self.verify) {
            Some(Route::Verify)
        } else if is_segment(path, &self.unsubscribe) {
            Some(Route::Unsubscribe)
        } else {
            None
        }
    }
}

impl From<&RouteSettings> for Routes {
    fn from(settings: &RouteSettings) -> Self {
        Self::new(
            settings.subscribe_path.as_str(),
            settings.verify_path.as_str(),
            settings.unsubscribe_path.as_str(),
        )
    }
}

/// `/segment` and `/segment/` both match
fn is_segment(path: &str, segment: &str) -> bool {
    path.strip_prefix('/')
        .map(|rest| rest.strip_suffix('/').unwrap_or(rest))
        .map_or(false, |rest| rest == segment)
}

/// The subscription workflow, with every collaborator passed in explicitly
pub struct Subscriptions {
    store: Arc<dyn ContactStore>,
    notifier: Arc<dyn Notifier>,
    routes: Routes,
    pages: Pages,
    policy: Policy,
}

impl Subscriptions {
    pub fn new(
        store: Arc<dyn ContactStore>,
        notifier: Arc<dyn Notifier>,
        routes: Routes,
        pages: Pages,
        policy: Policy,
    ) -> Self {
        Self {
            store,
            notifier,
            routes,
            pages,
            policy,
        }
    }

    /// Wire up the configured store backend and email client
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn ContactStore> = match settings.store.backend() {
            StoreBackend::Memory => Arc::new(InMemoryContactStore::new()),
            StoreBackend::Dynamodb => Arc::new(DynamoContactStore::connect(&settings.store).await),
        };

        let email_client = EmailClient::new(
            settings.email.sender()?,
            settings.email.sender_name(),
            settings.email.api_timeout(),
            settings.email.api_base_url()?,
            settings.email.api_auth_token(),
        )?;
        let notifier = VerificationNotifier::new(
            email_client,
            settings.routes.api_url()?,
            settings.routes.verify_path.as_str(),
        );

        Ok(Self::new(
            store,
            Arc::new(notifier),
            Routes::from(&settings.routes),
            Pages::from(&settings.pages),
            settings.routes.policy,
        ))
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Run one invocation and pick its redirect. Failures are logged here and
    /// never surface to the caller beyond landing on the error page.
    pub async fn respond(&self, request: &InboundRequest) -> Redirect {
        let page = match self.dispatch(request).await {
            Ok(page) => page,
            Err(e) => {
                log_failure(request, &e);
                Page::Error
            }
        };
        Redirect::to(self.pages.url(page))
    }

    /// Route a request by path
    pub async fn dispatch(&self, request: &InboundRequest) -> SubscribeResult<Page> {
        match self.routes.route(request.path(), self.policy) {
            Some(Route::Subscribe) => self.subscribe(request).await,
            Some(Route::Verify) => self.verify(request).await,
            Some(Route::Unsubscribe) => self.unsubscribe(request).await,
            None => Err(SubscribeError::UnknownPath(request.path().to_string())),
        }
    }

    /// Request a new subscription.
    /// Ends on the same page whether or not the address was already known.
    #[tracing::instrument(name = "Subscribe", skip(self, request), fields(policy = ?self.policy))]
    pub async fn subscribe(&self, request: &InboundRequest) -> SubscribeResult<Page> {
        match self.policy {
            Policy::DoubleOptIn => {
                let email = required_email(request)?;
                let id = ContactId::generate();

                self.store.upsert(&email, &id, &timestamp(), false).await?;
                self.notifier.send_verification_email(&email, &id).await?;
            }
            Policy::SingleStep => {
                // Client supplied and unauthenticated, this only deters naive form spam
                let is_bot =
                    request.param("notbot") != Some("true") || request.param("isbot").is_some();
                if is_bot {
                    return Err(SubscribeError::SuspectedBot);
                }
                let email = required_email(request)?;

                let contact = Contact {
                    email: email.to_string(),
                    id: ContactId::generate().to_string(),
                    confirm: None,
                    timestamp: timestamp(),
                };
                self.store.insert(&contact).await?;
            }
        }

        Ok(Page::ConfirmSubscribe)
    }

    /// Confirm a pending subscription with the emailed email and id
    #[tracing::instrument(name = "Verify a subscription", skip(self, request))]
    pub async fn verify(&self, request: &InboundRequest) -> SubscribeResult<Page> {
        let (email, id) = email_and_id(request)?;

        if !self.store.find_match(&email, &id).await? {
            return Err(SubscribeError::NoMatch);
        }
        self.store.upsert(&email, &id, &timestamp(), true).await?;

        Ok(Page::Success)
    }

    /// Remove a subscription
    #[tracing::instrument(name = "Unsubscribe", skip(self, request), fields(policy = ?self.policy))]
    pub async fn unsubscribe(&self, request: &InboundRequest) -> SubscribeResult<Page> {
        match self.policy {
            Policy::DoubleOptIn => {
                let (email, id) = email_and_id(request)?;

                if !self.store.find_match(&email, &id).await? {
                    return Err(SubscribeError::NoMatch);
                }
                // Conditional on the pair, in case the record changed since the lookup
                self.store.delete(&email, &id).await?;

                Ok(Page::ConfirmUnsubscribe)
            }
            Policy::SingleStep => {
                let id: ContactId = request
                    .param("id")
                    .ok_or(SubscribeError::MissingParameters)?
                    .parse()
                    .map_err(SubscribeError::Validation)?;

                self.store.delete_by_id(&id).await?;

                Ok(Page::Success)
            }
        }
    }
}

fn required_email(request: &InboundRequest) -> SubscribeResult<EmailAddress> {
    request
        .param("email")
        .ok_or(SubscribeError::MissingParameters)?
        .parse()
        .map_err(SubscribeError::Validation)
}

fn email_and_id(request: &InboundRequest) -> SubscribeResult<(EmailAddress, ContactId)> {
    let (Some(email), Some(id)) = (request.param("email"), request.param("id")) else {
        return Err(SubscribeError::MissingParameters);
    };

    let email = email.parse().map_err(SubscribeError::Validation)?;
    let id = id.parse().map_err(SubscribeError::Validation)?;
    Ok((email, id))
}

fn log_failure(request: &InboundRequest, error: &SubscribeError) {
    match error {
        SubscribeError::Store(e) => tracing::error!(
            error.kind = %e.kind(),
            error.retryable = e.is_retryable(),
            error.message = %e,
            path = %request.path(),
            query = %request.raw_query(),
            "Contact store call failed"
        ),
        SubscribeError::Notify(e) => tracing::error!(
            error.cause_chain = ?e,
            error.message = %e,
            path = %request.path(),
            query = %request.raw_query(),
            "Could not send confirmation email"
        ),
        other => tracing::warn!(
            error.message = %other,
            path = %request.path(),
            query = %request.raw_query(),
            "Received a bad request"
        ),
    }
}
