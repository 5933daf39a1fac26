use crate::client::NotifyError;
use crate::repo::StoreError;

pub type SubscribeResult<T> = Result<T, SubscribeError>;

/// Reasons a workflow request ends on the error page.
/// Callers only ever see the redirect, the variant decides what gets logged.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    // Input errors, raised before any downstream call
    #[error("Invalid parameter: {0}")]
    Validation(String),
    #[error("Missing parameters in query string")]
    MissingParameters,
    #[error("Request did not pass the bot check")]
    SuspectedBot,
    #[error("No path match for path: {0}")]
    UnknownPath(String),
    // No stored record with this email and id
    #[error("No contact matches the supplied email and id")]
    NoMatch,
    // Downstream errors
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Could not send confirmation email: {0}")]
    Notify(#[from] NotifyError),
}
