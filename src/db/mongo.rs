//! MongoDB client and collection wrapper
//!
//! Typed collections with schema-declared indexes. The client exposes
//! session-based transactions so a commission batch commits
//! all-or-nothing.

use bson::{doc, DateTime, Document};
use mongodb::{
    options::IndexOptions, Client, ClientSession, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::{LedgerError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas carrying shared metadata timestamps
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // serverSelectionTimeoutMS avoids hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| LedgerError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| LedgerError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Start a session for multi-document transactions
    pub async fn start_session(&self) -> Result<ClientSession> {
        self.client
            .start_session()
            .await
            .map_err(|e| LedgerError::Database(format!("Failed to start session: {}", e)))
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| LedgerError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<()> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        self.inner
            .insert_one(item)
            .await
            .map_err(|e| LedgerError::Database(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    /// Insert a single document inside an open transaction. Unlike the
    /// batch path this surfaces the raw driver error so callers can
    /// distinguish a unique-index collision from other failures.
    pub async fn insert_one_in_session(
        &self,
        mut item: T,
        session: &mut ClientSession,
    ) -> std::result::Result<(), mongodb::error::Error> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        self.inner.insert_one(item).session(session).await?;
        Ok(())
    }

    /// Replace one document inside an open transaction (no upsert).
    /// The document write is what makes two concurrent transactions
    /// over the same filter conflict instead of both committing.
    pub async fn replace_one_in_session(
        &self,
        filter: Document,
        mut item: T,
        session: &mut ClientSession,
    ) -> Result<()> {
        let metadata = item.mut_metadata();
        if metadata.created_at.is_none() {
            metadata.created_at = Some(DateTime::now());
        }
        metadata.updated_at = Some(DateTime::now());

        self.inner
            .replace_one(filter, item)
            .session(session)
            .await
            .map_err(|e| LedgerError::Database(format!("Replace failed: {}", e)))?;

        Ok(())
    }

    /// Insert a batch of documents inside an open transaction.
    /// Timestamps are stamped here so every record in one calculation
    /// event shares the insert moment.
    pub async fn insert_many_in_session(
        &self,
        items: Vec<T>,
        session: &mut ClientSession,
    ) -> Result<()> {
        let now = DateTime::now();
        let stamped: Vec<T> = items
            .into_iter()
            .map(|mut item| {
                let metadata = item.mut_metadata();
                metadata.created_at = Some(now);
                metadata.updated_at = Some(now);
                item
            })
            .collect();

        self.inner
            .insert_many(stamped)
            .session(session)
            .await
            .map_err(|e| LedgerError::Database(format!("Batch insert failed: {}", e)))?;

        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| LedgerError::Database(format!("Find failed: {}", e)))
    }

    /// Find one document by filter, inside an open transaction
    pub async fn find_one_in_session(
        &self,
        filter: Document,
        session: &mut ClientSession,
    ) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .session(session)
            .await
            .map_err(|e| LedgerError::Database(format!("Find failed: {}", e)))
    }

    /// Find documents by filter, sorted
    pub async fn find_sorted(&self, filter: Document, sort: Document) -> Result<Vec<T>> {
        use futures_util::TryStreamExt;

        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .await
            .map_err(|e| LedgerError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| LedgerError::Database(format!("Cursor failed: {}", e)))
    }

    /// Count documents matching a filter
    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| LedgerError::Database(format!("Count failed: {}", e)))
    }

    /// Replace one document (upsert), refreshing updated_at
    pub async fn replace_one(&self, filter: Document, mut item: T) -> Result<()> {
        let metadata = item.mut_metadata();
        if metadata.created_at.is_none() {
            metadata.created_at = Some(DateTime::now());
        }
        metadata.updated_at = Some(DateTime::now());

        self.inner
            .replace_one(filter, item)
            .upsert(true)
            .await
            .map_err(|e| LedgerError::Database(format!("Replace failed: {}", e)))?;

        Ok(())
    }

    /// Delete one document by filter
    pub async fn delete_one(&self, filter: Document) -> Result<bool> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| LedgerError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count > 0)
    }
}
