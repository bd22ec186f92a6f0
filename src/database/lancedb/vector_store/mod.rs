
use super::{ChunkPayload, ChunkRecord};
use crate::config::Config;
use crate::{DocativeError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    index::Index,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Metadata columns that get a keyword-equality (scalar) index
const INDEXED_COLUMNS: [&str; 3] = ["bot_id", "owner_email", "display_name"];

/// Shared-collection vector store backed by LanceDB.
///
/// All bots live in one table; isolation is purely by metadata filtering, so
/// every read and delete must carry a [`ChunkFilter`]. Similarity search
/// restricts the candidate set to the filter before ranking.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// Exact-match metadata filter scoping reads and deletes to one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkFilter {
    BotId(String),
    OwnerEmail(String),
}

impl ChunkFilter {
    /// Render the filter as a LanceDB predicate. Values are quoted with
    /// single quotes escaped; an unescaped quote here would let one tenant's
    /// input widen another tenant's filter.
    fn predicate(&self) -> String {
        match self {
            ChunkFilter::BotId(value) => format!("bot_id = '{}'", escape_literal(value)),
            ChunkFilter::OwnerEmail(value) => {
                format!("owner_email = '{}'", escape_literal(value))
            }
        }
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// A retrieved chunk with its relevance score (higher is better)
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub payload: ChunkPayload,
    pub score: f32,
}

impl VectorStore {
    /// Connect to the collection directory and make sure the schema exists.
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            DocativeError::Index(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            table_name: config.collection.name.clone(),
            dimension: config.openai.embedding_dimension as usize,
        };

        store.ensure_schema().await?;

        info!("Vector store ready (collection '{}')", store.table_name);
        Ok(store)
    }

    /// Idempotent schema bootstrap: create the shared collection and the
    /// scalar indexes on its identity columns if absent. Safe to call
    /// repeatedly and concurrently; "already exists" races are ignored,
    /// everything else is surfaced.
    #[inline]
    pub async fn ensure_schema(&self) -> Result<()> {
        let table_names = self.table_names().await?;

        if !table_names.contains(&self.table_name) {
            info!(
                "Creating collection '{}' with {}-dimensional vectors",
                self.table_name, self.dimension
            );

            let schema = self.create_schema();
            if let Err(e) = self
                .connection
                .create_empty_table(&self.table_name, schema)
                .execute()
                .await
            {
                // A concurrent bootstrap may have won the race; only fail if
                // the table still does not exist.
                if !self.table_names().await?.contains(&self.table_name) {
                    return Err(DocativeError::Index(format!(
                        "Failed to create collection: {}",
                        e
                    )));
                }
                debug!("Collection '{}' created concurrently", self.table_name);
            }
        }

        self.ensure_scalar_indexes().await
    }

    async fn ensure_scalar_indexes(&self) -> Result<()> {
        let table = self.open_table().await?;

        // An empty table has nothing to index; the next bootstrap after data
        // arrives (or the out-of-band setup command) creates the indexes.
        let row_count = table
            .count_rows(None)
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to count rows: {}", e)))?;
        if row_count == 0 {
            debug!("Collection '{}' is empty; deferring scalar indexes", self.table_name);
            return Ok(());
        }

        let existing = Self::indexed_columns(&table).await?;

        for column in INDEXED_COLUMNS {
            if existing.iter().any(|c| c == column) {
                continue;
            }

            debug!("Creating scalar index on '{}'", column);
            if let Err(e) = table
                .create_index(&[column], Index::Auto)
                .execute()
                .await
            {
                let now_existing = Self::indexed_columns(&table).await?;
                if !now_existing.iter().any(|c| c == column) {
                    return Err(DocativeError::Index(format!(
                        "Failed to create index on {}: {}",
                        column, e
                    )));
                }
            }
        }

        Ok(())
    }

    async fn indexed_columns(table: &Table) -> Result<Vec<String>> {
        let indices = table
            .list_indices()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to list indexes: {}", e)))?;

        Ok(indices
            .into_iter()
            .flat_map(|index| index.columns)
            .collect())
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to list tables: {}", e)))
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to open collection: {}", e)))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("bot_id", DataType::Utf8, false),
            Field::new("owner_email", DataType::Utf8, false),
            Field::new("display_name", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Write a batch of chunk points. The batch is handed to the index as a
    /// single call so a partial failure is never hidden from the caller:
    /// either the call returns `Ok` or the whole ingestion aborts.
    #[inline]
    pub async fn upsert_chunks(&self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No chunks to store");
            return Ok(());
        }

        for record in &records {
            if record.vector.len() != self.dimension {
                return Err(DocativeError::Index(format!(
                    "expected {}-dimensional vectors, got {}",
                    self.dimension,
                    record.vector.len()
                )));
            }
        }

        debug!("Storing batch of {} chunks", records.len());

        let record_batch = self.create_record_batch(&records)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to insert chunks: {}", e)))?;

        info!("Stored {} chunks", records.len());
        Ok(())
    }

    fn create_record_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut bot_ids = Vec::with_capacity(len);
        let mut owner_emails = Vec::with_capacity(len);
        let mut display_names = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for record in records {
            ids.push(record.id.as_str());
            bot_ids.push(record.payload.bot_id.as_str());
            owner_emails.push(record.payload.owner_email.as_str());
            display_names.push(record.payload.display_name.as_str());
            contents.push(record.payload.content.as_str());
            chunk_indices.push(record.payload.chunk_index);
            created_ats.push(record.payload.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| DocativeError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(bot_ids)),
            Arc::new(StringArray::from(owner_emails)),
            Arc::new(StringArray::from(display_names)),
            Arc::new(StringArray::from(contents)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| DocativeError::Index(format!("Failed to create record batch: {}", e)))
    }

    /// Fetch up to `limit` chunk payloads matching the filter; used with
    /// `limit = 1` as the existence check for a bot or an owner.
    #[inline]
    pub async fn find_by_filter(
        &self,
        filter: &ChunkFilter,
        limit: usize,
    ) -> Result<Vec<ChunkPayload>> {
        let table = self.open_table().await?;

        let results = table
            .query()
            .only_if(filter.predicate())
            .limit(limit)
            .execute()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to execute filter query: {}", e)))?;

        let scored = Self::parse_results_stream(results).await?;
        Ok(scored.into_iter().map(|chunk| chunk.payload).collect())
    }

    /// Remove every point matching the filter; used to purge a prior bot
    /// when an owner replaces it.
    #[inline]
    pub async fn delete_by_filter(&self, filter: &ChunkFilter) -> Result<()> {
        debug!("Deleting chunks where {}", filter.predicate());

        let table = self.open_table().await?;
        table
            .delete(&filter.predicate())
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to delete chunks: {}", e)))?;

        info!("Deleted chunks where {}", filter.predicate());
        Ok(())
    }

    /// Similarity search restricted to the filter. The filter is applied to
    /// the candidate set BEFORE ranking (pre-filter); ranking first and
    /// filtering after would leak other bots' chunks into the candidate set.
    #[inline]
    pub async fn similarity_search(
        &self,
        query_vector: &[f32],
        filter: &ChunkFilter,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        debug!("Searching {} nearest chunks where {}", k, filter.predicate());

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| DocativeError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .only_if(filter.predicate())
            .limit(k)
            .execute()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to execute search: {}", e)))?;

        let mut chunks = Self::parse_results_stream(results).await?;
        // LanceDB returns ascending distance; keep descending relevance.
        chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(chunks)
    }

    /// Total number of stored chunks across all bots
    #[inline]
    pub async fn count_chunks(&self) -> Result<u64> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    async fn parse_results_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<ScoredChunk>> {
        let mut chunks = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| DocativeError::Index(format!("Failed to read result stream: {}", e)))?
        {
            chunks.extend(Self::parse_batch(&batch)?);
        }

        debug!("Parsed {} chunks from result stream", chunks.len());
        Ok(chunks)
    }

    fn parse_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
        let bot_ids = string_column(batch, "bot_id")?;
        let owner_emails = string_column(batch, "owner_email")?;
        let display_names = string_column(batch, "display_name")?;
        let contents = string_column(batch, "content")?;
        let created_ats = string_column(batch, "created_at")?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| DocativeError::Index("Missing chunk_index column".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut chunks = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            chunks.push(ScoredChunk {
                payload: ChunkPayload {
                    bot_id: bot_ids.value(row).to_string(),
                    owner_email: owner_emails.value(row).to_string(),
                    display_name: display_names.value(row).to_string(),
                    content: contents.value(row).to_string(),
                    chunk_index: chunk_indices.value(row),
                    created_at: created_ats.value(row).to_string(),
                },
                // Cosine distance in [0, 2]; flip so higher means closer.
                score: 1.0 - distance,
            });
        }

        Ok(chunks)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DocativeError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DocativeError::Index(format!("Invalid {} column type", name)))
}
