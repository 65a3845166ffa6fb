//! [`SqliteStore`]: the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use settree_core::store::{
  BatchOp, Collection, Document, DocumentStore, Filter, Record, Subscription,
};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawRecord, encode_document, encode_filters, encode_merge, encode_uuid},
  schema::SCHEMA,
};

/// Capacity of the change-notification channel shared by subscriptions.
const CHANGE_CAPACITY: usize = 256;

/// Snapshots buffered per subscription before the refresher waits.
const SNAPSHOT_BUFFER: usize = 16;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and the change channel are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  changes: broadcast::Sender<Collection>,
}

/// A batch write after encoding, ready to move onto the database thread.
enum RawOp {
  Set {
    collection: &'static str,
    id:         String,
    data_json:  String,
  },
  Update {
    collection: &'static str,
    id:         Uuid,
    sql:        String,
    params:     Vec<String>,
  },
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::from_connection(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::from_connection(conn).await
  }

  async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
    let store = Self { conn, changes };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Wake subscriptions watching `collection`. Having no subscribers is fine.
  fn notify(&self, collection: Collection) { let _ = self.changes.send(collection); }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn get_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Record>> {
    let coll   = collection.as_str();
    let id_str = encode_uuid(id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc_id, data_json FROM documents
               WHERE collection = ?1 AND doc_id = ?2",
              rusqlite::params![coll, id_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn query<'a>(
    &'a self,
    collection: Collection,
    filters:    &'a [Filter],
  ) -> Result<Vec<Record>> {
    let filter_sql = encode_filters(filters, 2)?;
    let sql = format!(
      "SELECT doc_id, data_json FROM documents
       WHERE collection = ?1{}
       ORDER BY rowid",
      filter_sql.conditions
    );
    let mut params = vec![rusqlite::types::Value::Text(collection.as_str().to_owned())];
    params.extend(filter_sql.params);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn add(&self, collection: Collection, data: Document) -> Result<Uuid> {
    let id        = Uuid::new_v4();
    let coll      = collection.as_str();
    let id_str    = encode_uuid(id);
    let data_json = encode_document(&data)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (collection, doc_id, data_json) VALUES (?1, ?2, ?3)",
          rusqlite::params![coll, id_str, data_json],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(collection = coll, %id, "document added");
    self.notify(collection);
    Ok(id)
  }

  async fn update(&self, collection: Collection, id: Uuid, data: Document) -> Result<()> {
    let coll   = collection.as_str();
    let id_str = encode_uuid(id);
    let merge  = encode_merge(&data)?;

    let changed = self
      .conn
      .call(move |conn| {
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&coll, &id_str];
        params.extend(merge.params.iter().map(|p| p as &dyn rusqlite::ToSql));
        Ok(conn.execute(&merge.sql, params.as_slice())?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::DocumentNotFound { collection: coll, id });
    }

    tracing::debug!(collection = coll, %id, fields = data.len(), "document updated");
    self.notify(collection);
    Ok(())
  }

  async fn delete(&self, collection: Collection, id: Uuid) -> Result<()> {
    let coll   = collection.as_str();
    let id_str = encode_uuid(id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
          rusqlite::params![coll, id_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(collection = coll, %id, "document deleted");
    self.notify(collection);
    Ok(())
  }

  async fn batch_write(&self, ops: Vec<BatchOp>) -> Result<()> {
    let mut touched: Vec<Collection> = Vec::new();
    let mut raw_ops = Vec::with_capacity(ops.len());

    for op in &ops {
      let raw = match op {
        BatchOp::Set { collection, id, data } => {
          if !touched.contains(collection) {
            touched.push(*collection);
          }
          RawOp::Set {
            collection: collection.as_str(),
            id:         encode_uuid(*id),
            data_json:  encode_document(data)?,
          }
        }
        BatchOp::Update { collection, id, data } => {
          if !touched.contains(collection) {
            touched.push(*collection);
          }
          let merge = encode_merge(data)?;
          RawOp::Update {
            collection: collection.as_str(),
            id:         *id,
            sql:        merge.sql,
            params:     merge.params,
          }
        }
      };
      raw_ops.push(raw);
    }

    let op_count = raw_ops.len();
    let missing = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for op in raw_ops {
          match op {
            RawOp::Set { collection, id, data_json } => {
              tx.execute(
                "INSERT INTO documents (collection, doc_id, data_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT (collection, doc_id) DO UPDATE SET data_json = excluded.data_json",
                rusqlite::params![collection, id, data_json],
              )?;
            }
            RawOp::Update { collection, id, sql, params } => {
              let id_str = encode_uuid(id);
              let mut bound: Vec<&dyn rusqlite::ToSql> = vec![&collection, &id_str];
              bound.extend(params.iter().map(|p| p as &dyn rusqlite::ToSql));
              if tx.execute(&sql, bound.as_slice())? == 0 {
                // Dropping the transaction rolls back everything so far.
                return Ok(Some((collection, id)));
              }
            }
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    if let Some((collection, id)) = missing {
      return Err(Error::DocumentNotFound { collection, id });
    }

    tracing::debug!(ops = op_count, "batch committed");
    for collection in touched {
      self.notify(collection);
    }
    Ok(())
  }

  async fn subscribe(
    &self,
    collection: Collection,
    filters:    Vec<Filter>,
  ) -> Result<Subscription> {
    // Subscribe to changes before reading, so nothing slips between the
    // initial snapshot and the first notification.
    let mut changes = self.changes.subscribe();
    let initial = self.query(collection, &filters).await?;

    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
    // The receiver is still in scope, so this cannot fail.
    let _ = tx.send(initial).await;

    let store = self.clone();
    let task = tokio::spawn(async move {
      loop {
        match changes.recv().await {
          Ok(changed) if changed != collection => continue,
          Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
          Err(broadcast::error::RecvError::Closed) => break,
        }

        match store.query(collection, &filters).await {
          Ok(snapshot) => {
            if tx.send(snapshot).await.is_err() {
              break;
            }
          }
          Err(e) => {
            tracing::warn!(
              collection = collection.as_str(),
              error = %e,
              "subscription refresh failed"
            );
          }
        }
      }
    });

    Ok(Subscription::new(rx, task))
  }
}
