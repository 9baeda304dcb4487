//! Draft document and the schema merge rules.
//!
//! The draft is the artifact a conversation builds up over many turns.
//! Merging a partial update must never lose data the user already
//! approved: ownership fields persist unless explicitly replaced,
//! accumulating lists are unioned rather than overwritten, and scalar
//! content fields only change when the update actually supplies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status of a draft.
///
/// New drafts always start in [`DraftStatus::Draft`]; the status only
/// advances when an update explicitly supplies a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Being written; the default for every new draft.
    #[default]
    Draft,
    /// Submitted for editorial review.
    InReview,
    /// Published to readers.
    Published,
}

/// The article draft threaded through a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftDocument {
    /// Owning user (display name). Set once, never cleared by a merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Owning user id. Set once, never cleared by a merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Author display names.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Author ids.
    #[serde(default)]
    pub author_ids: Vec<String>,

    /// Publication status.
    #[serde(default)]
    pub status: DraftStatus,

    /// Article title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Short summary / annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Article body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Primary category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Accumulated keywords (set semantics across merges).
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Accumulated subject areas (set semantics across merges).
    #[serde(default)]
    pub subject_areas: Vec<String>,

    /// View counter, zeroed at creation and untouched by merges.
    #[serde(default)]
    pub view_count: u64,

    /// Comment counter, zeroed at creation and untouched by merges.
    #[serde(default)]
    pub comment_count: u64,

    /// When the draft was first created.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every merge.
    pub updated_at: DateTime<Utc>,
}

impl DraftDocument {
    /// Create an empty draft owned by nobody, timestamped now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            owner: None,
            owner_id: None,
            authors: Vec::new(),
            author_ids: Vec::new(),
            status: DraftStatus::Draft,
            title: None,
            summary: None,
            body: None,
            category: None,
            keywords: Vec::new(),
            subject_areas: Vec::new(),
            view_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for DraftDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// A partial draft update, as proposed by the analysis step.
///
/// Every field is optional; absent fields leave the prior draft value
/// untouched. List fields accumulate into the prior lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DraftStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_areas: Vec<String>,
}

impl DraftUpdate {
    /// True if the update carries nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fold a partial update into an existing draft.
///
/// With no prior draft the update becomes the draft, with identity
/// fields defaulted (draft status, zeroed counters, timestamps set to
/// now). With a prior draft:
///
/// - scalar content fields are replaced only when the update supplies them
/// - `keywords` / `subject_areas` are unioned (deduplicated, prior order first)
/// - ownership fields persist unless the update explicitly supplies them
/// - `updated_at` is always refreshed
pub fn merge(prior: Option<&DraftDocument>, update: &DraftUpdate) -> DraftDocument {
    let now = Utc::now();

    let mut draft = match prior {
        Some(d) => d.clone(),
        None => DraftDocument::new(),
    };

    // Ownership: overwrite only on explicit instruction.
    if update.owner.is_some() {
        draft.owner = update.owner.clone();
    }
    if update.owner_id.is_some() {
        draft.owner_id = update.owner_id.clone();
    }
    if let Some(ref authors) = update.authors {
        draft.authors = authors.clone();
    }
    if let Some(ref author_ids) = update.author_ids {
        draft.author_ids = author_ids.clone();
    }
    if let Some(status) = update.status {
        draft.status = status;
    }

    // Content scalars: replace when present.
    if update.title.is_some() {
        draft.title = update.title.clone();
    }
    if update.summary.is_some() {
        draft.summary = update.summary.clone();
    }
    if update.body.is_some() {
        draft.body = update.body.clone();
    }
    if update.category.is_some() {
        draft.category = update.category.clone();
    }

    // Accumulating lists: union, never wholesale replacement.
    union_into(&mut draft.keywords, &update.keywords);
    union_into(&mut draft.subject_areas, &update.subject_areas);

    draft.updated_at = now;
    draft
}

/// Append items from `incoming` that are not already in `existing`.
fn union_into(existing: &mut Vec<String>, incoming: &[String]) {
    for item in incoming {
        if !existing.iter().any(|e| e == item) {
            existing.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_with_keywords(keywords: &[&str]) -> DraftUpdate {
        DraftUpdate {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_draft_defaults() {
        let update = DraftUpdate {
            title: Some("My article".to_string()),
            keywords: vec!["rust".to_string()],
            ..Default::default()
        };

        let draft = merge(None, &update);
        assert_eq!(draft.title.as_deref(), Some("My article"));
        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.view_count, 0);
        assert_eq!(draft.comment_count, 0);
        assert_eq!(draft.keywords, vec!["rust"]);
        assert!(draft.owner.is_none());
    }

    #[test]
    fn test_scalar_replace_when_present() {
        let mut prior = DraftDocument::new();
        prior.title = Some("Old title".to_string());
        prior.summary = Some("Old summary".to_string());

        let update = DraftUpdate {
            title: Some("New title".to_string()),
            ..Default::default()
        };

        let merged = merge(Some(&prior), &update);
        assert_eq!(merged.title.as_deref(), Some("New title"));
        // Absent in the update — unchanged.
        assert_eq!(merged.summary.as_deref(), Some("Old summary"));
    }

    #[test]
    fn test_ownership_persists_when_update_omits_it() {
        let mut prior = DraftDocument::new();
        prior.owner = Some("u1".to_string());
        prior.owner_id = Some("id-1".to_string());
        prior.authors = vec!["Alice".to_string()];

        let update = DraftUpdate {
            title: Some("Title".to_string()),
            ..Default::default()
        };

        let merged = merge(Some(&prior), &update);
        assert_eq!(merged.owner.as_deref(), Some("u1"));
        assert_eq!(merged.owner_id.as_deref(), Some("id-1"));
        assert_eq!(merged.authors, vec!["Alice"]);
    }

    #[test]
    fn test_ownership_overwritten_only_when_explicit() {
        let mut prior = DraftDocument::new();
        prior.owner = Some("u1".to_string());

        let update = DraftUpdate {
            owner: Some("u2".to_string()),
            ..Default::default()
        };

        let merged = merge(Some(&prior), &update);
        assert_eq!(merged.owner.as_deref(), Some("u2"));
    }

    #[test]
    fn test_keyword_union_law() {
        let mut prior = DraftDocument::new();
        prior.keywords = vec!["a".to_string(), "b".to_string()];

        let merged = merge(Some(&prior), &update_with_keywords(&["b", "c"]));
        assert_eq!(merged.keywords, vec!["a", "b", "c"]);

        // Order of incoming items must not introduce duplicates.
        let merged = merge(Some(&prior), &update_with_keywords(&["c", "b", "a"]));
        assert_eq!(merged.keywords, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_idempotent_modulo_updated_at() {
        let mut prior = DraftDocument::new();
        prior.owner = Some("u1".to_string());
        prior.keywords = vec!["a".to_string()];

        let update = DraftUpdate {
            title: Some("Title".to_string()),
            keywords: vec!["b".to_string()],
            ..Default::default()
        };

        let once = merge(Some(&prior), &update);
        let mut twice = merge(Some(&once), &update);
        twice.updated_at = once.updated_at;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_partial_schema_merge_scenario() {
        let mut prior = DraftDocument::new();
        prior.keywords = vec!["a".to_string(), "b".to_string()];
        prior.owner = Some("u1".to_string());

        let merged = merge(Some(&prior), &update_with_keywords(&["b", "c"]));
        assert_eq!(merged.keywords, vec!["a", "b", "c"]);
        assert_eq!(merged.owner.as_deref(), Some("u1"));
    }

    #[test]
    fn test_status_advances_only_on_instruction() {
        let prior = DraftDocument::new();
        assert_eq!(prior.status, DraftStatus::Draft);

        let merged = merge(Some(&prior), &DraftUpdate::default());
        assert_eq!(merged.status, DraftStatus::Draft);

        let update = DraftUpdate {
            status: Some(DraftStatus::InReview),
            ..Default::default()
        };
        let merged = merge(Some(&prior), &update);
        assert_eq!(merged.status, DraftStatus::InReview);
    }

    #[test]
    fn test_updated_at_refreshed() {
        let mut prior = DraftDocument::new();
        prior.updated_at = prior.updated_at - chrono::Duration::hours(1);
        let before = prior.updated_at;

        let merged = merge(Some(&prior), &DraftUpdate::default());
        assert!(merged.updated_at > before);
        assert_eq!(merged.created_at, prior.created_at);
    }

    #[test]
    fn test_counters_untouched_by_merge() {
        let mut prior = DraftDocument::new();
        prior.view_count = 42;
        prior.comment_count = 7;

        let merged = merge(Some(&prior), &update_with_keywords(&["x"]));
        assert_eq!(merged.view_count, 42);
        assert_eq!(merged.comment_count, 7);
    }

    #[test]
    fn test_update_is_empty() {
        assert!(DraftUpdate::default().is_empty());
        assert!(!update_with_keywords(&["a"]).is_empty());
    }

    #[test]
    fn test_update_deserializes_from_sparse_json() {
        let update: DraftUpdate =
            serde_json::from_str(r#"{"title": "T", "keywords": ["k1"]}"#).unwrap();
        assert_eq!(update.title.as_deref(), Some("T"));
        assert_eq!(update.keywords, vec!["k1"]);
        assert!(update.owner.is_none());
    }
}
