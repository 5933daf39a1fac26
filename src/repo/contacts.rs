use std::fmt;

use async_trait::async_trait;

use crate::domain::{ContactId, EmailAddress};

/// Stored contact record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Mailbox address, the primary key for double opt-in tables
    pub email: String,
    /// Opaque correlation token, the primary key for single-step tables
    pub id: String,
    /// Confirmation flag. `None` for single-step records, which carry no such field
    pub confirm: Option<bool>,
    /// Last-modified time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

impl Contact {
    /// Whether both the stored email and the stored id equal the supplied pair
    pub fn matches(&self, email: &EmailAddress, id: &ContactId) -> bool {
        self.email == email.as_ref() && self.id == id.as_ref()
    }
}

/// Classification of a failed downstream store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Throughput, request or collection size limits were hit
    ResourceLimit,
    /// The table (or another addressed resource) does not exist
    NotFound,
    /// A condition check or concurrent transaction prevented the write
    Conflict,
    /// The store failed internally or could not be reached
    Internal,
    /// Any other vendor error
    Unknown,
}

impl StoreErrorKind {
    /// Map a vendor error code onto a kind
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some(
                "ProvisionedThroughputExceededException"
                | "RequestLimitExceeded"
                | "ItemCollectionSizeLimitExceededException"
                | "ThrottlingException",
            ) => Self::ResourceLimit,
            Some("ResourceNotFoundException") => Self::NotFound,
            Some("ConditionalCheckFailedException" | "TransactionConflictException") => {
                Self::Conflict
            }
            Some("InternalServerError" | "ServiceUnavailable") => Self::Internal,
            _ => Self::Unknown,
        }
    }

    /// Whether a later attempt could plausibly succeed. Nothing retries automatically.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ResourceLimit | Self::Internal)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::ResourceLimit => "resource limit",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downstream store call failed
#[derive(Debug, thiserror::Error)]
#[error("Contact store call failed ({kind}): {message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value store holding contact records
///
/// Double opt-in deployments key the table by `email` and use `get`, `upsert`
/// and `delete`; single-step deployments key it by `id` and use `insert` and
/// `delete_by_id`. Every call is a single attempt.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Fetch the record stored under `email`
    async fn get(&self, email: &EmailAddress) -> StoreResult<Option<Contact>>;

    /// Create or overwrite the record stored under `email`.
    /// No authorization happens here, callers check the id first where it matters.
    async fn upsert(
        &self,
        email: &EmailAddress,
        id: &ContactId,
        timestamp: &str,
        confirm: bool,
    ) -> StoreResult<()>;

    /// Delete the record stored under `email`, provided its email and id still match
    async fn delete(&self, email: &EmailAddress, id: &ContactId) -> StoreResult<()>;

    /// Put a record keyed by its id
    async fn insert(&self, contact: &Contact) -> StoreResult<()>;

    /// Delete the record keyed by `id`, whether or not it exists
    async fn delete_by_id(&self, id: &ContactId) -> StoreResult<()>;

    /// Whether a record exists for `email` with exactly this id
    async fn find_match(&self, email: &EmailAddress, id: &ContactId) -> StoreResult<bool> {
        let contact = self.get(email).await?;
        let matched = contact.map_or(false, |contact| contact.matches(email, id));
        if !matched {
            tracing::info!("No match for email: {} with id: {}", email, id);
        }
        Ok(matched)
    }
}
