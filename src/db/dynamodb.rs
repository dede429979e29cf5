//! DynamoDB store
//!
//! Implements [`ItemStore`] over the AWS DynamoDB SDK client for the single
//! migration table.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use aws_smithy_runtime_api::client::result::SdkError;
use std::collections::BTreeMap;

use super::attributes::item_to_plain;
use super::models::{ItemKey, MigrationItem};
use super::store::{ItemStore, ScanPage, StoreError};
use crate::config::{create_dynamodb_client, Settings};

const INSERT_IF_ABSENT: &str = "attribute_not_exists(pk) AND attribute_not_exists(sk)";
const UPDATE_IF_EXISTS: &str = "attribute_exists(pk) AND attribute_exists(sk)";

/// Error codes DynamoDB returns for bad or missing credentials
const AUTH_ERROR_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "AccessDeniedException",
    "InvalidSignatureException",
    "IncompleteSignatureException",
    "MissingAuthenticationTokenException",
    "ExpiredTokenException",
];

/// DynamoDB-backed item store bound to one table.
#[derive(Clone)]
pub struct DynamoDbStore {
    /// AWS DynamoDB SDK client
    client: DynamoDbSdkClient,

    table: String,
}

impl DynamoDbStore {
    pub fn new(client: DynamoDbSdkClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Build a store from settings (region, endpoint override, table name)
    pub async fn from_settings(settings: &Settings) -> Self {
        let client = create_dynamodb_client(settings).await;
        Self::new(client, settings.dynamodb_table.clone())
    }

    /// Get the table name
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    async fn check_connection(&self) -> Result<(), StoreError> {
        let output = self
            .client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        tracing::debug!(
            table = %self.table,
            status = ?output.table.and_then(|t| t.table_status),
            "Connected to DynamoDB table"
        );
        Ok(())
    }

    async fn put_if_absent(&self, item: &MigrationItem) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item.to_dynamodb()))
            .condition_expression(INSERT_IF_ABSENT)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(())
    }

    async fn update_if_exists(
        &self,
        key: &ItemKey,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let assignments: Vec<String> = attributes
            .keys()
            .map(|name| format!("{name} = :{name}"))
            .collect();

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .set_key(Some(key.to_dynamodb()))
            .update_expression(format!("SET {}", assignments.join(", ")))
            .condition_expression(UPDATE_IF_EXISTS);

        for (name, value) in attributes {
            request = request.expression_attribute_values(
                format!(":{name}"),
                AttributeValue::S(value.clone()),
            );
        }

        request.send().await.map_err(classify_sdk_error)?;

        Ok(())
    }

    async fn item_exists(&self, key: &ItemKey) -> Result<bool, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table)
            .set_key(Some(key.to_dynamodb()))
            .projection_expression("pk")
            .consistent_read(true)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(result.item.is_some())
    }

    async fn scan_page(&self, start: Option<ItemKey>) -> Result<ScanPage, StoreError> {
        let result = self
            .client
            .scan()
            .table_name(&self.table)
            .set_exclusive_start_key(start.map(|k| k.to_dynamodb()))
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let items = result
            .items
            .unwrap_or_default()
            .iter()
            .map(item_to_plain)
            .collect();

        let last_evaluated_key = match result.last_evaluated_key {
            Some(key) if !key.is_empty() => Some(ItemKey::from_dynamodb(&key).ok_or_else(|| {
                StoreError::Malformed("LastEvaluatedKey without string pk/sk".to_string())
            })?),
            _ => None,
        };

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }
}

/// Map an SDK error onto the store error taxonomy.
///
/// Requests that never got a response (dispatch, timeout, construction
/// failures such as missing credentials) are connection errors.
pub fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service_err) => {
            let error = service_err.err();
            let code = error.code().unwrap_or("Unknown").to_string();
            let message = error.message().unwrap_or_default().to_string();

            match code.as_str() {
                "ConditionalCheckFailedException" => StoreError::ConditionFailed(message),
                "ResourceNotFoundException" => StoreError::TableNotFound(message),
                c if AUTH_ERROR_CODES.contains(&c) => StoreError::Auth(format!("{code}: {message}")),
                _ => StoreError::Service { code, message },
            }
        }
        SdkError::ResponseError(_) => StoreError::Service {
            code: "ResponseError".to_string(),
            message: DisplayErrorContext(&err).to_string(),
        },
        _ => StoreError::Connection(DisplayErrorContext(&err).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::error::ErrorMetadata;
    use aws_sdk_dynamodb::operation::put_item::PutItemError;
    use aws_sdk_dynamodb::types::error::ConditionalCheckFailedException;
    use aws_smithy_runtime_api::client::result::ConnectorError;

    type PutSdkError = SdkError<PutItemError, ()>;

    fn metadata(code: &str, message: &str) -> ErrorMetadata {
        ErrorMetadata::builder().code(code).message(message).build()
    }

    fn service_error(code: &str, message: &str) -> PutSdkError {
        SdkError::service_error(PutItemError::generic(metadata(code, message)), ())
    }

    #[test]
    fn test_conditional_check_failure_maps_to_condition_failed() {
        let exception = ConditionalCheckFailedException::builder()
            .message("The conditional request failed")
            .meta(metadata(
                "ConditionalCheckFailedException",
                "The conditional request failed",
            ))
            .build();
        let err: PutSdkError = SdkError::service_error(
            PutItemError::ConditionalCheckFailedException(exception),
            (),
        );

        let mapped = classify_sdk_error(err);
        assert!(mapped.is_condition_failed());
        assert!(!mapped.is_fatal());
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let mapped = classify_sdk_error(service_error(
            "ResourceNotFoundException",
            "Requested resource not found",
        ));
        assert_eq!(
            mapped,
            StoreError::TableNotFound("Requested resource not found".to_string())
        );
        assert!(mapped.is_fatal());
    }

    #[test]
    fn test_rejected_credentials_are_fatal() {
        let mapped = classify_sdk_error(service_error(
            "UnrecognizedClientException",
            "The security token included in the request is invalid.",
        ));
        assert!(matches!(&mapped, StoreError::Auth(msg) if msg.starts_with("UnrecognizedClientException")));
        assert!(mapped.is_fatal());
    }

    #[test]
    fn test_throttling_fails_only_the_unit() {
        let mapped = classify_sdk_error(service_error(
            "ProvisionedThroughputExceededException",
            "Rate of requests exceeds the allowed throughput",
        ));
        assert_eq!(
            mapped,
            StoreError::Service {
                code: "ProvisionedThroughputExceededException".to_string(),
                message: "Rate of requests exceeds the allowed throughput".to_string(),
            }
        );
        assert!(!mapped.is_fatal());
        assert!(!mapped.is_condition_failed());
    }

    #[test]
    fn test_requests_without_response_are_connection_errors() {
        let timeout: PutSdkError = SdkError::timeout_error("operation timed out");
        assert!(matches!(classify_sdk_error(timeout), StoreError::Connection(_)));

        let dispatch: PutSdkError =
            SdkError::dispatch_failure(ConnectorError::io("connection refused".into()));
        let mapped = classify_sdk_error(dispatch);
        assert!(matches!(&mapped, StoreError::Connection(_)));
        assert!(mapped.is_fatal());
    }

    #[test]
    fn test_unreadable_response_is_a_service_error() {
        let err: PutSdkError = SdkError::response_error("truncated body", ());
        assert!(matches!(
            classify_sdk_error(err),
            StoreError::Service { code, .. } if code == "ResponseError"
        ));
    }

    #[tokio::test]
    async fn test_store_from_settings_uses_table_name() {
        let mut settings = Settings::default();
        settings.dynamodb_table = "cello-test".to_string();
        settings.dynamodb_endpoint_url = Some("http://localhost:8001".to_string());

        let store = DynamoDbStore::from_settings(&settings).await;
        assert_eq!(store.table(), "cello-test");
    }
}
