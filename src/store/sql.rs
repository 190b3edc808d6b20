use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, QueryResult, Statement, TransactionTrait,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{into_object, merge_fields, DocumentStore, StoreResult};

/// Document store over a single `documents` table, reached through sea-orm.
///
/// Bodies are stored as JSON text so the same table definition works on
/// SQLite and Postgres; see [`crate::db::ensure_schema`].
#[derive(Debug, Clone)]
pub struct SqlStore {
    db: Arc<DatabaseConnection>,
}

const SELECT_ONE: &str = "SELECT body FROM documents WHERE collection = $1 AND id = $2";
const SELECT_ALL: &str = "SELECT id, body FROM documents WHERE collection = $1 ORDER BY id";
const UPSERT: &str = "INSERT INTO documents (collection, id, body, updated_at) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at";
const DELETE: &str = "DELETE FROM documents WHERE collection = $1 AND id = $2";

impl SqlStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    fn statement(&self, sql: &str, values: Vec<sea_orm::Value>) -> Statement {
        Statement::from_sql_and_values(self.backend(), placeholders(self.backend(), sql), values)
    }

    fn upsert(&self, collection: &str, id: &str, body: &Value) -> Statement {
        self.statement(
            UPSERT,
            vec![
                collection.into(),
                id.into(),
                body.to_string().into(),
                Utc::now().to_rfc3339().into(),
            ],
        )
    }
}

/// Postgres takes `$n`; SQLite takes the equivalent `?n`.
fn placeholders(backend: DbBackend, sql: &str) -> String {
    match backend {
        DbBackend::Postgres => sql.to_string(),
        _ => sql.replace('$', "?"),
    }
}

fn decode_body(row: &QueryResult) -> StoreResult<Value> {
    let body: String = row.try_get("", "body")?;
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl DocumentStore for SqlStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let row = self
            .db
            .query_one(self.statement(SELECT_ONE, vec![collection.into(), id.into()]))
            .await?;
        row.as_ref().map(decode_body).transpose()
    }

    #[instrument(skip(self, document))]
    async fn set(&self, collection: &str, id: &str, document: Value) -> StoreResult<()> {
        let document = Value::Object(into_object(document)?);
        self.db.execute(self.upsert(collection, id, &document)).await?;
        debug!(collection, id, "document written");
        Ok(())
    }

    #[instrument(skip(self, fields))]
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Value> {
        let select = match self.backend() {
            DbBackend::Postgres => format!("{SELECT_ONE} FOR UPDATE"),
            _ => SELECT_ONE.to_string(),
        };

        let txn = self.db.begin().await?;
        let existing = txn
            .query_one(self.statement(&select, vec![collection.into(), id.into()]))
            .await?;
        let mut base = match existing.as_ref().map(decode_body).transpose()? {
            Some(doc) => into_object(doc)?,
            None => Map::new(),
        };
        merge_fields(&mut base, fields);
        let merged = Value::Object(base);
        txn.execute(self.upsert(collection, id, &merged)).await?;
        txn.commit().await?;

        debug!(collection, id, "document merged");
        Ok(merged)
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = self
            .db
            .execute(self.statement(DELETE, vec![collection.into(), id.into()]))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        let rows = self
            .db
            .query_all(self.statement(SELECT_ALL, vec![collection.into()]))
            .await?;
        rows.iter()
            .map(|row| {
                let id: String = row.try_get("", "id")?;
                Ok((id, decode_body(row)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    async fn sqlite_store() -> SqlStore {
        let conn = db::connect_sqlite_memory().await.unwrap();
        db::ensure_schema(&conn).await.unwrap();
        SqlStore::new(Arc::new(conn))
    }

    #[test]
    fn sqlite_placeholders_are_numbered_question_marks() {
        assert_eq!(
            placeholders(DbBackend::Sqlite, "a = $1 AND b = $2"),
            "a = ?1 AND b = ?2"
        );
        assert_eq!(placeholders(DbBackend::Postgres, "a = $1"), "a = $1");
    }

    #[tokio::test]
    async fn set_get_list_delete_round_trip() {
        let store = sqlite_store().await;

        store
            .set("materials", "m-2", json!({ "name": "Twill" }))
            .await
            .unwrap();
        store
            .set("materials", "m-1", json!({ "name": "Poplin" }))
            .await
            .unwrap();

        assert_eq!(
            store.get("materials", "m-1").await.unwrap(),
            Some(json!({ "name": "Poplin" }))
        );
        let ids: Vec<_> = store
            .list("materials")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["m-1", "m-2"]);

        assert!(store.delete("materials", "m-1").await.unwrap());
        assert!(store.get("materials", "m-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_keeps_sibling_fields() {
        let store = sqlite_store().await;
        store
            .set(
                "production_logs",
                "2024-03-01",
                json!({ "date": "2024-03-01", "machines": [{ "machine": "Juki-1" }] }),
            )
            .await
            .unwrap();

        let merged = store
            .merge(
                "production_logs",
                "2024-03-01",
                into_object(json!({ "materials": [] })).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(merged["machines"][0]["machine"], "Juki-1");
        assert_eq!(merged["materials"], json!([]));
        assert_eq!(
            store.get("production_logs", "2024-03-01").await.unwrap(),
            Some(merged)
        );
    }
}
