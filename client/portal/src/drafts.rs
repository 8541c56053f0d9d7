//! Saved-progress application drafts.
//!
//! Drafts live in the key/value store as one JSON array under
//! [`DRAFTS_KEY`]. Each entry is keyed by `scholarshipId`; every other field
//! is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::Result;
use crate::store::{KeyValueStore, DRAFTS_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    #[serde(rename = "scholarshipId")]
    pub scholarship_id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ApplicationDraft {
    pub fn new(scholarship_id: i64) -> Self {
        ApplicationDraft {
            scholarship_id,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Read all drafts. Content that is not a JSON array reads as no drafts;
/// individual malformed entries are skipped.
pub async fn load_drafts<S: KeyValueStore>(store: &S) -> Result<Vec<ApplicationDraft>> {
    let Some(raw) = store.get(DRAFTS_KEY).await? else {
        return Ok(Vec::new());
    };

    let entries = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) | Err(_) => {
            warn!("Ignoring malformed draft storage");
            return Ok(Vec::new());
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

pub async fn find_draft<S: KeyValueStore>(
    store: &S,
    scholarship_id: i64,
) -> Result<Option<ApplicationDraft>> {
    Ok(load_drafts(store)
        .await?
        .into_iter()
        .find(|d| d.scholarship_id == scholarship_id))
}

/// Insert or replace the draft for its scholarship.
pub async fn save_draft<S: KeyValueStore>(store: &S, draft: ApplicationDraft) -> Result<()> {
    let mut drafts = load_drafts(store).await?;
    match drafts
        .iter_mut()
        .find(|d| d.scholarship_id == draft.scholarship_id)
    {
        Some(existing) => *existing = draft,
        None => drafts.push(draft),
    }
    write_drafts(store, &drafts).await
}

pub async fn delete_draft<S: KeyValueStore>(store: &S, scholarship_id: i64) -> Result<()> {
    let drafts: Vec<ApplicationDraft> = load_drafts(store)
        .await?
        .into_iter()
        .filter(|d| d.scholarship_id != scholarship_id)
        .collect();
    write_drafts(store, &drafts).await
}

async fn write_drafts<S: KeyValueStore>(store: &S, drafts: &[ApplicationDraft]) -> Result<()> {
    store
        .set(DRAFTS_KEY, &serde_json::to_string(drafts)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn empty_store_has_no_drafts() {
        let store = MemoryStore::new();
        assert!(load_drafts(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_by_scholarship() {
        let store = MemoryStore::new();
        save_draft(&store, ApplicationDraft::new(4).with_field("major", "Art"))
            .await
            .unwrap();
        save_draft(&store, ApplicationDraft::new(5)).await.unwrap();
        save_draft(&store, ApplicationDraft::new(4).with_field("major", "Music"))
            .await
            .unwrap();

        let drafts = load_drafts(&store).await.unwrap();
        assert_eq!(drafts.len(), 2);
        let four = find_draft(&store, 4).await.unwrap().unwrap();
        assert_eq!(four.fields["major"], "Music");
    }

    #[tokio::test]
    async fn delete_removes_only_that_draft() {
        let store = MemoryStore::new();
        save_draft(&store, ApplicationDraft::new(1)).await.unwrap();
        save_draft(&store, ApplicationDraft::new(2)).await.unwrap();
        delete_draft(&store, 1).await.unwrap();

        let ids: Vec<i64> = load_drafts(&store)
            .await
            .unwrap()
            .iter()
            .map(|d| d.scholarship_id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn malformed_storage_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(DRAFTS_KEY, r#"{"not":"an array"}"#).await.unwrap();
        assert!(load_drafts(&store).await.unwrap().is_empty());

        store.set(DRAFTS_KEY, "not json").await.unwrap();
        assert!(load_drafts(&store).await.unwrap().is_empty());

        store
            .set(DRAFTS_KEY, r#"[{"scholarshipId": 3, "gpa": "3.1"}, {"junk": true}]"#)
            .await
            .unwrap();
        let drafts = load_drafts(&store).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].fields["gpa"], "3.1");
    }
}
