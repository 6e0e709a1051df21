use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{
        AttributeDefinition, BillingMode, DeleteRequest, KeySchemaElement, KeyType,
        ProvisionedThroughput, PutRequest, ScalarAttributeType, TableStatus, WriteRequest,
    },
    Client,
};
use tracing::{debug, error, info};

use crate::dynamodb::backend::{Backend, WriteOp};
use crate::dynamodb::error::{
    map_batch_write_error, map_create_table_error, map_delete_table_error,
    map_describe_table_error, map_put_item_error, map_scan_error, Result, StoreError,
};
use crate::dynamodb::{Item, Table};

/// DynamoDB client wrapper implementing [`Backend`].
///
/// Each method is a thin translation between the crate's types and the AWS
/// SDK request builders. Service errors come back as [`StoreError`] so the
/// lifecycle code can branch on already-exists, not-found and in-use
/// without looking at SDK types.
///
/// # Batch writes
///
/// `BatchWriteItem` accepts at most 25 operations and may return some of
/// them as unprocessed under throttling. This adapter hands those back to
/// the caller; [`BatchWriter`](super::BatchWriter) owns the resubmission.
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Verifies authentication by attempting to list tables.
    pub async fn check_auth(&self) -> anyhow::Result<()> {
        self.client.list_tables().limit(1).send().await.map_err(|e| {
            error!("Authentication failed: {}", e);
            anyhow::anyhow!("Authentication failed")
        })?;
        info!("Authentication successful");
        Ok(())
    }
}

#[async_trait]
impl Backend for DynamoDb {
    async fn create_table(&self, table: &Table) -> Result<()> {
        let attribute_definition = AttributeDefinition::builder()
            .attribute_name(table.hash_key())
            .attribute_type(ScalarAttributeType::S)
            .build()?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name(table.hash_key())
            .key_type(KeyType::Hash)
            .build()?;

        let throughput = table.throughput();
        let provisioned_throughput = ProvisionedThroughput::builder()
            .read_capacity_units(throughput.read_capacity_units)
            .write_capacity_units(throughput.write_capacity_units)
            .build()?;

        self.client
            .create_table()
            .table_name(table.name())
            .billing_mode(BillingMode::Provisioned)
            .attribute_definitions(attribute_definition)
            .key_schema(key_schema)
            .provisioned_throughput(provisioned_throughput)
            .send()
            .await
            .map_err(|e| map_create_table_error(e, table.name()))?;

        info!("Create requested for table '{}'", table.name());
        Ok(())
    }

    async fn table_status(&self, table_name: &str) -> Result<TableStatus> {
        let output = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| map_describe_table_error(e, table_name))?;

        output
            .table()
            .and_then(|description| description.table_status())
            .cloned()
            .ok_or_else(|| {
                StoreError::Other(format!("DescribeTable returned no status for '{table_name}'"))
            })
    }

    async fn delete_table(&self, table_name: &str) -> Result<()> {
        self.client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| map_delete_table_error(e, table_name))?;
        info!("Delete requested for table '{table_name}'");
        Ok(())
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item.attributes))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, table_name))?;

        debug!("Item added to '{table_name}'");
        Ok(())
    }

    async fn scan(&self, table_name: &str, limit: usize) -> Result<Vec<Item>> {
        let limit = i32::try_from(limit)
            .map_err(|_| StoreError::Other(format!("scan limit {limit} out of range")))?;

        let response = self
            .client
            .scan()
            .table_name(table_name)
            .limit(limit)
            .send()
            .await
            .map_err(|e| map_scan_error(e, table_name))?;

        Ok(response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(Item::from)
            .collect())
    }

    async fn batch_write(&self, table_name: &str, ops: Vec<WriteOp>) -> Result<Vec<WriteOp>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let requests = ops
            .into_iter()
            .map(to_write_request)
            .collect::<Result<Vec<WriteRequest>>>()?;

        let response = self
            .client
            .batch_write_item()
            .request_items(table_name, requests)
            .send()
            .await
            .map_err(|e| map_batch_write_error(e, table_name))?;

        Ok(response
            .unprocessed_items
            .unwrap_or_default()
            .into_values()
            .flatten()
            .filter_map(from_write_request)
            .collect())
    }
}

fn to_write_request(op: WriteOp) -> Result<WriteRequest> {
    let request = match op {
        WriteOp::Put(item) => WriteRequest::builder()
            .put_request(
                PutRequest::builder()
                    .set_item(Some(item.attributes))
                    .build()?,
            )
            .build(),
        WriteOp::Delete(key) => WriteRequest::builder()
            .delete_request(
                DeleteRequest::builder()
                    .set_key(Some(key.attributes))
                    .build()?,
            )
            .build(),
    };
    Ok(request)
}

fn from_write_request(request: WriteRequest) -> Option<WriteOp> {
    if let Some(put) = request.put_request {
        return Some(WriteOp::Put(Item::from(put.item)));
    }
    request
        .delete_request
        .map(|delete| WriteOp::Delete(Item::from(delete.key)))
}
