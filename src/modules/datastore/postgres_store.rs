//! PostgreSQL-backed document store
//!
//! Every collection lives in the single `documents` table as JSONB. Unset
//! fields are removed with the `jsonb - text[]` operator so an update never
//! rewrites fields it does not name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::types::Constraint;
use super::{Datastore, DatastoreError, DatastoreResult, Document, Fields, Patch, Query};

#[derive(Debug, FromRow)]
struct DocumentRow {
    object_id: String,
    data: Json<Fields>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self, class_name: &str) -> Document {
        Document {
            id: self.object_id,
            class_name: class_name.to_string(),
            fields: self.data.0,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Datastore for PgDocumentStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find(&self, class_name: &str, query: &Query) -> DatastoreResult<Vec<Document>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT object_id, data, created_at, updated_at FROM documents WHERE class_name = ",
        );
        builder.push_bind(class_name);

        for (key, constraint) in &query.constraints {
            match constraint {
                Constraint::EqualTo(value) => {
                    builder.push(" AND data -> ");
                    builder.push_bind(key.clone());
                    builder.push(" = ");
                    builder.push_bind(Json(value.clone()));
                }
                Constraint::Exists(exists) => {
                    builder.push(" AND COALESCE(data -> ");
                    builder.push_bind(key.clone());
                    builder.push(if *exists {
                        ", 'null'::jsonb) <> 'null'::jsonb"
                    } else {
                        ", 'null'::jsonb) = 'null'::jsonb"
                    });
                }
            }
        }

        builder.push(" ORDER BY created_at, object_id");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows: Vec<DocumentRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query {} documents: {:?}", class_name, e);
                DatastoreError::Database(e)
            })?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_document(class_name))
            .collect())
    }

    async fn get(&self, class_name: &str, id: &str) -> DatastoreResult<Document> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            SELECT object_id, data, created_at, updated_at
            FROM documents
            WHERE class_name = $1 AND object_id = $2
            "#,
        )
        .bind(class_name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_document(class_name))
            .ok_or_else(|| DatastoreError::not_found(class_name, id))
    }

    async fn add(&self, class_name: &str, fields: Fields) -> DatastoreResult<Document> {
        let id = Uuid::now_v7().simple().to_string();

        let row: DocumentRow = sqlx::query_as(
            r#"
            INSERT INTO documents (class_name, object_id, data)
            VALUES ($1, $2, $3)
            RETURNING object_id, data, created_at, updated_at
            "#,
        )
        .bind(class_name)
        .bind(&id)
        .bind(Json(&fields))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert {} document: {:?}", class_name, e);
            DatastoreError::Database(e)
        })?;

        Ok(row.into_document(class_name))
    }

    async fn update(&self, class_name: &str, id: &str, patch: &Patch) -> DatastoreResult<()> {
        let (set, unset) = patch.split();

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = (data || $3) - $4::text[],
                updated_at = NOW()
            WHERE class_name = $1 AND object_id = $2
            "#,
        )
        .bind(class_name)
        .bind(id)
        .bind(Json(Value::Object(set)))
        .bind(&unset)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update {} document {}: {:?}", class_name, id, e);
            DatastoreError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(DatastoreError::not_found(class_name, id));
        }

        Ok(())
    }
}
