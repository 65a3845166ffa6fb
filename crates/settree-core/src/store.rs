//! The `DocumentStore` trait and the flat-document types it traffics in.
//!
//! The trait is implemented by storage backends (e.g. `settree-store-sqlite`).
//! The engine depends on this abstraction only; it never sees SQL.

use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

use crate::{Error, Result};

/// A flat JSON object as persisted by a backend. Never contains `id`.
pub type Document = Map<String, Value>;

// ─── Collections ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Settings,
  History,
}

impl Collection {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Settings => "settings",
      Self::History => "settings_history",
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored document together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
  pub id:   Uuid,
  pub data: Document,
}

impl Record {
  /// Deserialise into a domain type whose `id` field receives the record id.
  pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
    let mut data = self.data;
    data.insert("id".into(), Value::String(self.id.to_string()));
    Ok(serde_json::from_value(Value::Object(data))?)
  }
}

/// Serialise a domain type into a [`Document`], dropping its `id` field.
pub fn encode_document<T: Serialize>(value: &T) -> Result<Document> {
  match serde_json::to_value(value)? {
    Value::Object(mut map) => {
      map.remove("id");
      Ok(map)
    }
    Value::Array(_) => Err(Error::NotAnObject("array")),
    Value::String(_) => Err(Error::NotAnObject("string")),
    Value::Number(_) => Err(Error::NotAnObject("number")),
    Value::Bool(_) => Err(Error::NotAnObject("bool")),
    Value::Null => Err(Error::NotAnObject("null")),
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// A single predicate over a top-level document field. Backends AND all
/// filters of a query together; there is no aggregation or ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  /// Field equals `value`. A `null` value also matches a missing field.
  Eq { field: String, value: Value },
  /// Field is an array that contains `value`.
  Contains { field: String, value: Value },
}

impl Filter {
  pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::Eq { field: field.into(), value: value.into() }
  }

  pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Self::Contains { field: field.into(), value: value.into() }
  }

  pub fn field(&self) -> &str {
    match self {
      Self::Eq { field, .. } | Self::Contains { field, .. } => field,
    }
  }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// One write inside [`DocumentStore::batch_write`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
  /// Create or fully overwrite the document at `id`.
  Set {
    collection: Collection,
    id:         Uuid,
    data:       Document,
  },
  /// Merge `data` into the existing document at `id`.
  Update {
    collection: Collection,
    id:         Uuid,
    data:       Document,
  },
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// A live query. Yields the full matching snapshot once on creation and
/// again whenever a matching collection changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
  receiver: mpsc::Receiver<Vec<Record>>,
  task:     JoinHandle<()>,
}

impl Subscription {
  pub fn new(receiver: mpsc::Receiver<Vec<Record>>, task: JoinHandle<()>) -> Self {
    Self { receiver, task }
  }

  /// Wait for the next snapshot. Returns `None` once the backend stops
  /// delivering.
  pub async fn next(&mut self) -> Option<Vec<Record>> { self.receiver.recv().await }

  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) { self.task.abort(); }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a document-store backend.
///
/// Every call is a suspension point. Backends guarantee per-document
/// consistency and batch atomicity, nothing more.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Reserve an id for a document that will be written by a batch.
  fn allocate_id(&self, _collection: Collection) -> Uuid { Uuid::new_v4() }

  /// Retrieve a document by id. Returns `None` if not found.
  fn get_by_id(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Return every document in `collection` matching all `filters`, in no
  /// particular order.
  fn query<'a>(
    &'a self,
    collection: Collection,
    filters: &'a [Filter],
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Persist a new document and return its generated id.
  fn add(
    &self,
    collection: Collection,
    data: Document,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  /// Merge `data` into an existing document. Fails if it does not exist.
  fn update(
    &self,
    collection: Collection,
    id: Uuid,
    data: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a document. Deleting a missing document is not an error.
  fn delete(
    &self,
    collection: Collection,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Apply all `ops` atomically.
  fn batch_write(
    &self,
    ops: Vec<BatchOp>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Open a live query over `collection`.
  fn subscribe(
    &self,
    collection: Collection,
    filters: Vec<Filter>,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;
}
