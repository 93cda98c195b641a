//! Process-lifetime demo stores
//!
//! Both stores live for the life of the process and are shared by every
//! connection, so each map sits behind an async `RwLock`.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::models::Item2;

/// Text stored for a task created by get-or-create
pub const NEW_TASK_TEXT: &str = "This didn't exist before";

/// Read-only fixture served by the dependency endpoints
pub const FAKE_ITEMS_DB: [&str; 3] = ["Foo", "Bar", "Baz"];

pub struct ItemStore {
    items: RwLock<HashMap<String, Item2>>,
}

impl ItemStore {
    pub fn seeded() -> Self {
        let items = HashMap::from([
            (
                "foo".to_string(),
                Item2 {
                    name: Some("Foo".to_string()),
                    price: Some(50.2),
                    ..Item2::default()
                },
            ),
            (
                "bar".to_string(),
                Item2 {
                    name: Some("Bar".to_string()),
                    description: Some("The bartenders".to_string()),
                    price: Some(62.0),
                    tax: 20.2,
                    tags: Vec::new(),
                },
            ),
            (
                "baz".to_string(),
                Item2 {
                    name: Some("Baz".to_string()),
                    description: None,
                    price: Some(50.2),
                    tax: 10.5,
                    tags: Vec::new(),
                },
            ),
        ]);

        Self {
            items: RwLock::new(items),
        }
    }

    #[cfg(test)]
    pub async fn get(&self, id: &str) -> Option<Item2> {
        self.items.read().await.get(id).cloned()
    }

    /// Store `item` under `id`, replacing any previous record
    pub async fn replace(&self, id: &str, item: Item2) -> Item2 {
        self.items.write().await.insert(id.to_string(), item.clone());
        item
    }

    /// Merge the fields present in `update` onto the stored record.
    ///
    /// Returns `Ok(None)` when `id` is unknown. Read, merge and write happen
    /// under one write lock.
    pub async fn merge(
        &self,
        id: &str,
        update: &Map<String, Value>,
    ) -> Result<Option<Item2>, serde_json::Error> {
        let mut items = self.items.write().await;
        let Some(stored) = items.get_mut(id) else {
            return Ok(None);
        };
        let merged = stored.merged(update)?;
        stored.clone_from(&merged);
        Ok(Some(merged))
    }
}

pub struct TaskStore {
    tasks: RwLock<HashMap<String, String>>,
}

impl TaskStore {
    pub fn seeded() -> Self {
        let tasks = HashMap::from([(
            "foo".to_string(),
            "Listen to the Bar Fighters".to_string(),
        )]);
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// Return the stored text for `id`, creating it when absent.
    ///
    /// The second value is `true` when this call inserted the entry.
    pub async fn get_or_create(&self, id: &str) -> (String, bool) {
        let mut tasks = self.tasks.write().await;
        if let Some(existing) = tasks.get(id) {
            return (existing.clone(), false);
        }
        tasks.insert(id.to_string(), NEW_TASK_TEXT.to_string());
        (NEW_TASK_TEXT.to_string(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seeded_items() {
        let store = ItemStore::seeded();
        let bar = store.get("bar").await.unwrap();
        assert_eq!(bar.description.as_deref(), Some("The bartenders"));
        let foo = store.get("foo").await.unwrap();
        assert!((foo.tax - 10.5).abs() < f64::EPSILON);
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let store = ItemStore::seeded();
        let update = json!({"name": "Barz", "price": 3});
        let update = update.as_object().unwrap();

        let first = store.merge("bar", update).await.unwrap().unwrap();
        let second = store.merge("bar", update).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.name.as_deref(), Some("Barz"));
        assert_eq!(second.description.as_deref(), Some("The bartenders"));
        assert!((second.tax - 20.2).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_merge_unknown_id() {
        let store = ItemStore::seeded();
        let update = json!({"name": "x"});
        assert!(store
            .merge("missing", update.as_object().unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let store = ItemStore::seeded();
        store.replace("bar", Item2::default()).await;
        let bar = store.get("bar").await.unwrap();
        assert_eq!(bar.description, None);
        assert!((bar.tax - 10.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_get_or_create() {
        let store = TaskStore::seeded();
        assert_eq!(
            store.get_or_create("foo").await,
            ("Listen to the Bar Fighters".to_string(), false)
        );
        assert_eq!(store.get_or_create("new").await, (NEW_TASK_TEXT.to_string(), true));
        assert_eq!(store.get_or_create("new").await, (NEW_TASK_TEXT.to_string(), false));
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_creates_once() {
        let store = Arc::new(TaskStore::seeded());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_or_create("race").await.1 })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
