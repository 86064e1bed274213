use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use everdo_core::{
    store::{ProfileStore, StoreError, TaskStore, TaskSubscription},
    task::{Subtask, Task, TaskFields},
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{instrument, warn};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_POLL_SECS: u64 = 5;

/// Field paths of the mutable task document; every update replaces all of
/// them, so an omitted optional field is deleted remotely.
const TASK_FIELD_PATHS: [&str; 7] = [
    "title",
    "description",
    "date",
    "priority",
    "category",
    "completed",
    "subtasks",
];

/// Firestore connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

/// Task and profile documents over the Firestore REST surface. Documents
/// live under `users/{uid}/tasks`; the REST API has no push channel, so
/// subscriptions poll and emit a snapshot whenever the collection changed.
#[derive(Clone)]
pub struct FirestoreTaskStore {
    cfg: FirestoreConfig,
    client: reqwest::Client,
    id_token: Option<String>,
}

impl FirestoreTaskStore {
    pub fn new(cfg: FirestoreConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
            id_token: None,
        }
    }

    /// Attach the signed-in user's token; per-user documents are
    /// inaccessible without it.
    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    fn user_doc_url(&self, uid: &str) -> String {
        let base = self
            .cfg
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!(
            "{base}/projects/{}/databases/(default)/documents/users/{uid}",
            self.cfg.project_id
        )
    }

    fn tasks_url(&self, uid: &str) -> String {
        format!("{}/tasks", self.user_doc_url(uid))
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .query(&[("key", self.cfg.api_key.as_str())]);
        if let Some(token) = &self.id_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn fetch_snapshot(&self, uid: &str) -> Result<Vec<Task>, String> {
        let resp: ListDocumentsResponse = self
            .request(reqwest::Method::GET, self.tasks_url(uid))
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;
        let mut tasks: Vec<Task> = resp.documents.iter().map(task_from_document).collect();
        collate(&mut tasks);
        Ok(tasks)
    }
}

/// The server-assigned collation: lexicographic on the stored priority
/// label. The client-side sort still runs on top of this; snapshots only
/// need to be consistently ordered, not display-ordered.
fn collate(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.priority.label().cmp(b.priority.label()));
}

#[async_trait]
impl TaskStore for FirestoreTaskStore {
    #[instrument(skip_all, fields(uid))]
    async fn list(&self, uid: &str) -> Result<Vec<Task>, StoreError> {
        self.fetch_snapshot(uid)
            .await
            .map_err(|reason| StoreError::Write { reason })
    }

    #[instrument(skip_all, fields(uid))]
    async fn create(&self, uid: &str, fields: TaskFields) -> Result<Task, StoreError> {
        let doc: Document = self
            .request(reqwest::Method::POST, self.tasks_url(uid))
            .json(&fields_to_document(&fields))
            .send()
            .await
            .map_err(write_err)?
            .error_for_status()
            .map_err(write_err)?
            .json()
            .await
            .map_err(write_err)?;
        Ok(task_from_document(&doc))
    }

    #[instrument(skip_all, fields(uid, id))]
    async fn update(&self, uid: &str, id: &str, fields: TaskFields) -> Result<(), StoreError> {
        let mask: Vec<(&str, &str)> = TASK_FIELD_PATHS
            .iter()
            .map(|path| ("updateMask.fieldPaths", *path))
            .collect();
        self.request(reqwest::Method::PATCH, format!("{}/{id}", self.tasks_url(uid)))
            .query(&mask)
            .json(&fields_to_document(&fields))
            .send()
            .await
            .map_err(write_err)?
            .error_for_status()
            .map_err(write_err)?;
        Ok(())
    }

    #[instrument(skip_all, fields(uid, id))]
    async fn delete(&self, uid: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .request(
                reqwest::Method::DELETE,
                format!("{}/{id}", self.tasks_url(uid)),
            )
            .send()
            .await
            .map_err(write_err)?;
        // Deleting a document that is already gone counts as success.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        resp.error_for_status().map_err(write_err)?;
        Ok(())
    }

    #[instrument(skip_all, fields(uid))]
    async fn subscribe(&self, uid: &str) -> Result<TaskSubscription, StoreError> {
        let mut last = self
            .fetch_snapshot(uid)
            .await
            .map_err(|reason| StoreError::Subscription { reason })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(last.clone());

        let store = self.clone();
        let uid = uid.to_string();
        let period = Duration::from_secs(self.cfg.poll_interval_secs.unwrap_or(DEFAULT_POLL_SECS));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match store.fetch_snapshot(&uid).await {
                    Ok(snapshot) => {
                        if snapshot != last {
                            last = snapshot.clone();
                            if tx.send(snapshot).is_err() {
                                break;
                            }
                        }
                    }
                    // A failed poll keeps the subscription alive; the UI
                    // keeps rendering the last good snapshot.
                    Err(reason) => warn!(%uid, %reason, "task snapshot poll failed"),
                }
            }
        });

        Ok(TaskSubscription::new(rx))
    }
}

#[async_trait]
impl ProfileStore for FirestoreTaskStore {
    #[instrument(skip_all, fields(uid))]
    async fn avatar_url(&self, uid: &str) -> Result<Option<String>, StoreError> {
        let resp = self
            .request(reqwest::Method::GET, self.user_doc_url(uid))
            .send()
            .await
            .map_err(write_err)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Document = resp
            .error_for_status()
            .map_err(write_err)?
            .json()
            .await
            .map_err(write_err)?;
        Ok(doc
            .fields
            .get("avatarUrl")
            .and_then(|value| value.string_value.clone()))
    }

    #[instrument(skip_all, fields(uid))]
    async fn set_avatar_url(&self, uid: &str, url: &str) -> Result<(), StoreError> {
        let mut fields = BTreeMap::new();
        fields.insert("avatarUrl".to_string(), Value::string(url));
        self.request(reqwest::Method::PATCH, self.user_doc_url(uid))
            .query(&[("updateMask.fieldPaths", "avatarUrl")])
            .json(&WriteDocument { fields })
            .send()
            .await
            .map_err(write_err)?
            .error_for_status()
            .map_err(write_err)?;
        Ok(())
    }
}

fn write_err(err: reqwest::Error) -> StoreError {
    StoreError::Write {
        reason: err.to_string(),
    }
}

// Firestore's typed-value document encoding. Only the value kinds the task
// schema needs are modeled.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Value {
    #[serde(skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    boolean_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    array_value: Option<ArrayValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map_value: Option<MapValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct MapValue {
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl Value {
    fn string(s: impl Into<String>) -> Self {
        Value {
            string_value: Some(s.into()),
            ..Value::default()
        }
    }

    fn boolean(b: bool) -> Self {
        Value {
            boolean_value: Some(b),
            ..Value::default()
        }
    }

    fn array(values: Vec<Value>) -> Self {
        Value {
            array_value: Some(ArrayValue { values }),
            ..Value::default()
        }
    }

    fn map(fields: BTreeMap<String, Value>) -> Self {
        Value {
            map_value: Some(MapValue { fields }),
            ..Value::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Serialize)]
struct WriteDocument {
    fields: BTreeMap<String, Value>,
}

fn fields_to_document(fields: &TaskFields) -> WriteDocument {
    let mut map = BTreeMap::new();
    map.insert("title".to_string(), Value::string(&fields.title));
    if let Some(description) = &fields.description {
        map.insert("description".to_string(), Value::string(description));
    }
    map.insert("date".to_string(), Value::string(&fields.date));
    map.insert(
        "priority".to_string(),
        Value::string(fields.priority.label()),
    );
    map.insert(
        "category".to_string(),
        Value::string(fields.category.label()),
    );
    map.insert("completed".to_string(), Value::boolean(fields.completed));
    map.insert(
        "subtasks".to_string(),
        Value::array(fields.subtasks.iter().map(subtask_to_value).collect()),
    );
    WriteDocument { fields: map }
}

fn subtask_to_value(subtask: &Subtask) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), Value::string(&subtask.name));
    fields.insert("completed".to_string(), Value::boolean(subtask.completed));
    Value::map(fields)
}

fn subtask_from_value(value: &Value) -> Option<Subtask> {
    let map = value.map_value.as_ref()?;
    Some(Subtask {
        name: map.fields.get("name")?.string_value.clone()?,
        completed: map
            .fields
            .get("completed")
            .and_then(|v| v.boolean_value)
            .unwrap_or(false),
    })
}

fn doc_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn task_from_document(doc: &Document) -> Task {
    let string_field =
        |key: &str| doc.fields.get(key).and_then(|v| v.string_value.clone());
    let subtasks = doc
        .fields
        .get("subtasks")
        .and_then(|v| v.array_value.as_ref())
        .map(|array| array.values.iter().filter_map(subtask_from_value).collect())
        .unwrap_or_default();
    Task {
        id: doc_id(&doc.name),
        title: string_field("title").unwrap_or_default(),
        description: string_field("description"),
        date: string_field("date").unwrap_or_default(),
        // Unrecognized labels fall back to the defaults rather than
        // dropping the document.
        priority: string_field("priority")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        category: string_field("category")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        completed: doc
            .fields
            .get("completed")
            .and_then(|v| v.boolean_value)
            .unwrap_or(false),
        subtasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use everdo_core::task::{Category, Priority};

    fn cfg() -> FirestoreConfig {
        FirestoreConfig {
            project_id: "everdo-test".into(),
            api_key: "k".into(),
            base_url: None,
            poll_interval_secs: None,
        }
    }

    #[test]
    fn urls_nest_tasks_under_the_user_document() {
        let store = FirestoreTaskStore::new(cfg());
        assert_eq!(
            store.tasks_url("u1"),
            "https://firestore.googleapis.com/v1/projects/everdo-test/databases/(default)/documents/users/u1/tasks"
        );
    }

    #[test]
    fn document_encoding_uses_typed_values() {
        let fields = TaskFields {
            title: "Ship".into(),
            description: Some("the release".into()),
            date: "01/05/2026".into(),
            priority: Priority::High,
            category: Category::Work,
            completed: false,
            subtasks: vec![Subtask::new("tag"), Subtask::new("announce")],
        };
        let value = serde_json::to_value(fields_to_document(&fields)).expect("serialize");
        assert_eq!(value["fields"]["title"]["stringValue"], "Ship");
        assert_eq!(value["fields"]["priority"]["stringValue"], "High");
        assert_eq!(value["fields"]["completed"]["booleanValue"], false);
        assert_eq!(
            value["fields"]["subtasks"]["arrayValue"]["values"][0]["mapValue"]["fields"]["name"]
                ["stringValue"],
            "tag"
        );
    }

    #[test]
    fn omitted_description_is_not_serialized() {
        let fields = TaskFields {
            title: "Ship".into(),
            description: None,
            date: "01/05/2026".into(),
            priority: Priority::Low,
            category: Category::Fun,
            completed: false,
            subtasks: Vec::new(),
        };
        let value = serde_json::to_value(fields_to_document(&fields)).expect("serialize");
        assert!(value["fields"].get("description").is_none());
    }

    #[test]
    fn documents_decode_back_into_tasks() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "name": "projects/p/databases/(default)/documents/users/u1/tasks/abc123",
            "fields": {
                "title": { "stringValue": "Ship" },
                "date": { "stringValue": "01/05/2026" },
                "priority": { "stringValue": "Medium" },
                "category": { "stringValue": "Personal" },
                "completed": { "booleanValue": true },
                "subtasks": { "arrayValue": { "values": [
                    { "mapValue": { "fields": {
                        "name": { "stringValue": "tag" },
                        "completed": { "booleanValue": true }
                    }}}
                ]}}
            }
        }))
        .expect("deserialize");

        let task = task_from_document(&doc);
        assert_eq!(task.id, "abc123");
        assert_eq!(task.title, "Ship");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::Personal);
        assert!(task.completed);
        assert_eq!(task.subtasks.len(), 1);
        assert!(task.subtasks[0].completed);
    }

    #[test]
    fn unknown_labels_fall_back_to_defaults() {
        let doc: Document = serde_json::from_value(serde_json::json!({
            "name": "users/u1/tasks/x",
            "fields": {
                "title": { "stringValue": "odd" },
                "priority": { "stringValue": "Urgent" },
                "category": { "stringValue": "Errands" }
            }
        }))
        .expect("deserialize");
        let task = task_from_document(&doc);
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.category, Category::Work);
        assert!(!task.completed);
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn collation_orders_by_priority_label() {
        let mut tasks = vec![
            task_with_priority("m", Priority::Medium),
            task_with_priority("h", Priority::High),
            task_with_priority("l", Priority::Low),
        ];
        collate(&mut tasks);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["h", "l", "m"]);
    }

    fn task_with_priority(id: &str, priority: Priority) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            date: String::new(),
            priority,
            category: Category::Work,
            completed: false,
            subtasks: Vec::new(),
        }
    }
}
