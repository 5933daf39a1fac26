use std::collections::HashMap;

use async_trait::async_trait;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use crate::domain::{ContactId, EmailAddress};
use crate::settings::StoreSettings;

use super::{Contact, ContactStore, StoreError, StoreErrorKind, StoreResult};

/// Contact store backed by a DynamoDB table
#[derive(Debug, Clone)]
pub struct DynamoContactStore {
    client: Client,
    table_name: String,
}

impl DynamoContactStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build a client from the ambient AWS configuration chain
    pub async fn connect(settings: &StoreSettings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint_url) = settings.endpoint_url() {
            loader = loader.endpoint_url(endpoint_url);
        }
        let config = loader.load().await;

        Self::new(Client::new(&config), settings.table_name())
    }
}

#[async_trait]
impl ContactStore for DynamoContactStore {
    #[tracing::instrument(name = "Get contact by email", skip(self))]
    async fn get(&self, email: &EmailAddress) -> StoreResult<Option<Contact>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("email", string(email.as_ref()))
            .send()
            .await
            .map_err(classify)?;

        output.item().map(contact_from_item).transpose()
    }

    #[tracing::instrument(name = "Upsert contact", skip(self))]
    async fn upsert(
        &self,
        email: &EmailAddress,
        id: &ContactId,
        timestamp: &str,
        confirm: bool,
    ) -> StoreResult<()> {
        // Keyed on email only, so a repeated subscribe overrides the earlier id
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("email", string(email.as_ref()))
            .expression_attribute_names("#ID", "id")
            .expression_attribute_names("#T", "timestamp")
            .expression_attribute_names("#C", "confirm")
            .expression_attribute_values(":idval", string(id.as_ref()))
            .expression_attribute_values(":timeval", string(timestamp))
            .expression_attribute_values(":confirmval", AttributeValue::Bool(confirm))
            .update_expression("SET #C = :confirmval, #T = :timeval, #ID = :idval")
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    #[tracing::instrument(name = "Delete contact by email and id", skip(self))]
    async fn delete(&self, email: &EmailAddress, id: &ContactId) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("email", string(email.as_ref()))
            .expression_attribute_names("#E", "email")
            .expression_attribute_names("#ID", "id")
            .expression_attribute_values(":emailval", string(email.as_ref()))
            .expression_attribute_values(":idval", string(id.as_ref()))
            .condition_expression("#E = :emailval AND #ID = :idval")
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }

    #[tracing::instrument(name = "Insert contact by id", skip(self))]
    async fn insert(&self, contact: &Contact) -> StoreResult<()> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("id", string(&contact.id))
            .item("email", string(&contact.email))
            .item("timestamp", string(&contact.timestamp));
        if let Some(confirm) = contact.confirm {
            request = request.item("confirm", AttributeValue::Bool(confirm));
        }

        request.send().await.map_err(classify)?;
        Ok(())
    }

    #[tracing::instrument(name = "Delete contact by id", skip(self))]
    async fn delete_by_id(&self, id: &ContactId) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", string(id.as_ref()))
            .send()
            .await
            .map_err(classify)?;

        Ok(())
    }
}

fn string(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

fn contact_from_item(item: &HashMap<String, AttributeValue>) -> StoreResult<Contact> {
    let text = |name: &str| -> StoreResult<String> {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::Unknown,
                    format!("Stored contact is missing string attribute `{}`", name),
                )
            })
    };

    Ok(Contact {
        email: text("email")?,
        id: text("id")?,
        confirm: item
            .get("confirm")
            .and_then(|value| value.as_bool().ok())
            .copied(),
        timestamp: text("timestamp").unwrap_or_default(),
    })
}

/// Translate an SDK failure into a store error kind
fn classify<E, R>(error: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let kind = match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => StoreErrorKind::Internal,
        _ => StoreErrorKind::from_code(error.code()),
    };
    let error = StoreError::new(kind, DisplayErrorContext(&error).to_string());

    tracing::error!(
        error.kind = %kind,
        error.retryable = kind.is_retryable(),
        "{}",
        error
    );
    error
}
