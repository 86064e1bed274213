use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::task::{Task, TaskFields};

/// Boundary failures from the remote store. Non-fatal: the displayed
/// snapshot is always the last successfully received remote state, so a
/// failed write leaves local state untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("remote write failed: {reason}")]
    Write { reason: String },
    #[error("remote subscription failed: {reason}")]
    Subscription { reason: String },
}

/// A live feed of full-collection snapshots for one user. Dropping the
/// subscription stops delivery; writes already in flight may still land
/// remotely and are simply never observed here again.
pub struct TaskSubscription {
    rx: mpsc::UnboundedReceiver<Vec<Task>>,
}

impl TaskSubscription {
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<Task>>) -> Self {
        Self { rx }
    }

    /// Waits for the next snapshot. Returns `None` once the store side has
    /// shut down (e.g., sign-out tore the feed down).
    pub async fn next_snapshot(&mut self) -> Option<Vec<Task>> {
        self.rx.recv().await
    }

    /// Non-blocking variant for render loops.
    pub fn try_next_snapshot(&mut self) -> Option<Vec<Task>> {
        self.rx.try_recv().ok()
    }
}

/// Contract for the remote task collection at `users/{uid}/tasks`. Each
/// mutation is an independent round trip; there is no batching and no
/// transactional guarantee.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// One-shot fetch of the full collection, in server collation order.
    /// Subscriptions are built from the same snapshot.
    async fn list(&self, uid: &str) -> Result<Vec<Task>, StoreError>;

    /// Persist a new document; the store assigns the id.
    async fn create(&self, uid: &str, fields: TaskFields) -> Result<Task, StoreError>;

    /// Full replace of a document's mutable fields.
    async fn update(&self, uid: &str, id: &str, fields: TaskFields) -> Result<(), StoreError>;

    /// Remove a document. Deleting an absent document succeeds (idempotent).
    async fn delete(&self, uid: &str, id: &str) -> Result<(), StoreError>;

    /// Subscribe to full-collection snapshots. The current snapshot is
    /// delivered first, then one snapshot per observed change.
    async fn subscribe(&self, uid: &str) -> Result<TaskSubscription, StoreError>;
}

/// Contract for the per-user profile document at `users/{uid}`.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn avatar_url(&self, uid: &str) -> Result<Option<String>, StoreError>;
    async fn set_avatar_url(&self, uid: &str, url: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
struct UserRecords {
    tasks: Vec<Task>,
    avatar_url: Option<String>,
    watchers: Vec<mpsc::UnboundedSender<Vec<Task>>>,
}

/// In-memory task store for tests and offline smoke runs. Mirrors the
/// remote collation: snapshots are ordered lexicographically by the
/// priority label ("High" < "Low" < "Medium"), which is deliberately not
/// the client-side sort order.
#[derive(Default, Clone)]
pub struct InMemoryTaskStore {
    inner: Arc<Mutex<HashMap<String, UserRecords>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user<T>(
        &self,
        uid: &str,
        f: impl FnOnce(&mut UserRecords) -> T,
    ) -> Result<T, StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Write {
            reason: format!("lock poisoned: {err}"),
        })?;
        Ok(f(map.entry(uid.to_string()).or_default()))
    }
}

fn collation_snapshot(records: &UserRecords) -> Vec<Task> {
    let mut tasks = records.tasks.clone();
    tasks.sort_by(|a, b| a.priority.label().cmp(b.priority.label()));
    tasks
}

fn publish(records: &mut UserRecords) {
    let snapshot = collation_snapshot(records);
    records
        .watchers
        .retain(|tx| tx.send(snapshot.clone()).is_ok());
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list(&self, uid: &str) -> Result<Vec<Task>, StoreError> {
        self.with_user(uid, |records| collation_snapshot(records))
    }

    async fn create(&self, uid: &str, fields: TaskFields) -> Result<Task, StoreError> {
        self.with_user(uid, |records| {
            let task = fields.into_task(Uuid::new_v4().to_string());
            records.tasks.push(task.clone());
            publish(records);
            task
        })
    }

    async fn update(&self, uid: &str, id: &str, fields: TaskFields) -> Result<(), StoreError> {
        let updated = self.with_user(uid, |records| {
            let Some(task) = records.tasks.iter_mut().find(|t| t.id == id) else {
                return false;
            };
            *task = fields.into_task(id);
            publish(records);
            true
        })?;
        if updated {
            Ok(())
        } else {
            Err(StoreError::Write {
                reason: format!("no document with id {id}"),
            })
        }
    }

    async fn delete(&self, uid: &str, id: &str) -> Result<(), StoreError> {
        self.with_user(uid, |records| {
            let before = records.tasks.len();
            records.tasks.retain(|t| t.id != id);
            if records.tasks.len() != before {
                publish(records);
            }
        })
    }

    async fn subscribe(&self, uid: &str) -> Result<TaskSubscription, StoreError> {
        self.with_user(uid, |records| {
            let (tx, rx) = mpsc::unbounded_channel();
            // Initial snapshot fires immediately, like the remote listener.
            let _ = tx.send(collation_snapshot(records));
            records.watchers.push(tx);
            TaskSubscription::new(rx)
        })
    }
}

#[async_trait]
impl ProfileStore for InMemoryTaskStore {
    async fn avatar_url(&self, uid: &str) -> Result<Option<String>, StoreError> {
        self.with_user(uid, |records| records.avatar_url.clone())
    }

    async fn set_avatar_url(&self, uid: &str, url: &str) -> Result<(), StoreError> {
        self.with_user(uid, |records| {
            records.avatar_url = Some(url.to_string());
        })
    }
}
