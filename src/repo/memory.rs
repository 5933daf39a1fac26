use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{ContactId, EmailAddress};

use super::{Contact, ContactStore, StoreError, StoreErrorKind, StoreResult};

/// Process-local contact store for development and tests
///
/// Records written through the double opt-in operations are keyed by email,
/// records written through `insert` by id, mirroring the two table layouts.
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    contacts: Mutex<HashMap<String, Contact>>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record stored under a key (an email or an id)
    pub fn contact(&self, key: &str) -> Option<Contact> {
        self.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|contacts| contacts.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Contact>>> {
        self.contacts
            .lock()
            .map_err(|_| StoreError::new(StoreErrorKind::Internal, "Contact store lock poisoned"))
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn get(&self, email: &EmailAddress) -> StoreResult<Option<Contact>> {
        Ok(self.lock()?.get(email.as_ref()).cloned())
    }

    async fn upsert(
        &self,
        email: &EmailAddress,
        id: &ContactId,
        timestamp: &str,
        confirm: bool,
    ) -> StoreResult<()> {
        let contact = Contact {
            email: email.to_string(),
            id: id.to_string(),
            confirm: Some(confirm),
            timestamp: timestamp.to_string(),
        };
        self.lock()?.insert(email.to_string(), contact);
        Ok(())
    }

    async fn delete(&self, email: &EmailAddress, id: &ContactId) -> StoreResult<()> {
        let mut contacts = self.lock()?;
        match contacts.get(email.as_ref()) {
            Some(contact) if contact.matches(email, id) => {
                contacts.remove(email.as_ref());
                Ok(())
            }
            _ => Err(StoreError::new(
                StoreErrorKind::Conflict,
                "The conditional request failed",
            )),
        }
    }

    async fn insert(&self, contact: &Contact) -> StoreResult<()> {
        self.lock()?.insert(contact.id.clone(), contact.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &ContactId) -> StoreResult<()> {
        self.lock()?.remove(id.as_ref());
        Ok(())
    }
}
