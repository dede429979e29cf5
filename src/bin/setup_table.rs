//! CLI tool to create the Cello DynamoDB table
//!
//! Usage:
//!   cargo run --bin setup_table
//!
//! For local development with DynamoDB Local:
//!   DYNAMODB_ENDPOINT_URL=http://localhost:8001 cargo run --bin setup_table

use anyhow::Result;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use cello_migrate::config::{create_dynamodb_client, Settings};
use cello_migrate::db::models::{PARTITION_KEY, SORT_KEY};
use cello_migrate::db::{DynamoDbStore, ItemStore};
use clap::Parser;

/// Create the single Cello table (pk + sk, on-demand billing)
#[derive(Parser, Debug)]
#[command(name = "setup_table")]
#[command(about = "Create the Cello DynamoDB table")]
struct Args {
    /// DynamoDB endpoint URL (for local development)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Table name (overrides DYNAMODB_TABLE env var)
    #[arg(long)]
    table: Option<String>,

    /// AWS region (overrides AWS_REGION env var)
    #[arg(long)]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load()?;
    if let Some(url) = args.endpoint_url {
        settings.dynamodb_endpoint_url = Some(url);
    }
    if let Some(table) = args.table {
        settings.dynamodb_table = table;
    }
    if let Some(region) = args.region {
        settings.aws_region = region;
    }
    settings.validate()?;

    if let Some(url) = &settings.dynamodb_endpoint_url {
        println!("Using DynamoDB endpoint: {}", url);
    }

    let client = create_dynamodb_client(&settings).await;
    let table_name = settings.dynamodb_table.as_str();

    println!("\n🚀 Setting up DynamoDB table...\n");

    match create_table(&client, table_name).await {
        Ok(true) => println!("✅ Created table: {}", table_name),
        Ok(false) => println!("⏭️  Table already exists: {}", table_name),
        Err(e) => {
            println!("❌ Failed to create table {}: {}", table_name, e);
            return Err(e);
        }
    }

    println!("\n✅ Table setup complete!\n");

    Ok(())
}

async fn create_table(client: &aws_sdk_dynamodb::Client, table_name: &str) -> Result<bool> {
    // Check if table already exists (ResourceNotFoundException means create it)
    let store = DynamoDbStore::new(client.clone(), table_name);
    if store.table_exists().await? {
        return Ok(false);
    }

    client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(PARTITION_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(SORT_KEY)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(PARTITION_KEY)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(SORT_KEY)
                .key_type(KeyType::Range)
                .build()?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await?;

    Ok(true)
}
