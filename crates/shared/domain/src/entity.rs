//! Persistent record model shared by every table.
//!
//! A record is made of three layers:
//! - identity (`id`) with id-based equality,
//! - audit stamps written by persistence,
//! - the `active` flag and the `deleted` soft-delete marker.
//!
//! Soft delete never removes a row: `deleted` is set to the row's own id so
//! unique indexes over `(…, deleted)` keep working for recreated records.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::constants::NOT_DELETED;

/// Primary key type of every table.
pub type Id = i64;

/// Creation and modification stamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Id>,
}

impl AuditFields {
    /// Stamp creation and modification at once (insert).
    pub fn stamp_created(&mut self, now: DateTime<Utc>, actor: Option<Id>) {
        self.created_at = Some(now);
        self.created_by = actor;
        self.stamp_updated(now, actor);
    }

    /// Stamp modification only. Creation stamps are write-once.
    pub fn stamp_updated(&mut self, now: DateTime<Utc>, actor: Option<Id>) {
        self.updated_at = Some(now);
        self.updated_by = actor;
    }

    /// Replace all four stamps.
    pub fn set(
        &mut self,
        created_by: Option<Id>,
        created_at: Option<DateTime<Utc>>,
        updated_by: Option<Id>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        self.created_by = created_by;
        self.created_at = created_at;
        self.updated_by = updated_by;
        self.updated_at = updated_at;
    }
}

/// Per-request state that is never persisted nor serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordState {
    /// Set while a record is being inserted
    pub new_record: bool,
    /// `active` as it was when the row was read
    pub old_active: Option<bool>,
    /// Whether mapping should populate nested or expensive properties
    pub map_all_properties: bool,
    /// Per-item status for batch operations
    pub code: Option<i32>,
    pub message: Option<String>,
}

/// Columns every table carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseFields {
    pub id: Option<Id>,
    pub active: Option<bool>,
    pub deleted: Id,
    #[serde(flatten)]
    pub audit: AuditFields,
    #[serde(skip)]
    pub state: RecordState,
}

impl BaseFields {
    pub fn with_id(id: Id) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// True when the record has never been written.
    pub fn is_new_record(&self) -> bool {
        self.state.new_record || matches!(self.id, None | Some(0))
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted != NOT_DELETED
    }

    /// Insert callback.
    pub fn pre_persist(&mut self, now: DateTime<Utc>, actor: Option<Id>) {
        if self.active.is_none() {
            self.active = Some(true);
        }
        self.state.new_record = true;
        self.audit.stamp_created(now, actor);
    }

    /// Update callback. An unset `active` keeps the value read from the store.
    pub fn pre_update(&mut self, now: DateTime<Utc>, actor: Option<Id>) {
        if self.active.is_none() {
            self.active = self.state.old_active;
        }
        self.state.new_record = false;
        self.audit.stamp_updated(now, actor);
    }

    /// Called once a row has been read or written.
    pub fn mark_loaded(&mut self) {
        self.state.old_active = self.active;
        self.state.new_record = false;
    }

    pub fn mark_deleted(&mut self) {
        if let Some(id) = self.id {
            self.deleted = id;
        }
    }

    pub fn set_status(&mut self, code: i32, message: impl Into<String>) {
        self.state.code = Some(code);
        self.state.message = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.state.code.is_some_and(|code| code > 0)
    }
}

/// Id-based equality: only records with an id can be equal.
pub fn same_identity(left: Option<Id>, right: Option<Id>) -> bool {
    matches!((left, right), (Some(l), Some(r)) if l == r)
}

/// A persistent record.
///
/// Implement with [`impl_entity!`](crate::impl_entity), which also derives
/// id-based `PartialEq`, `Eq` and `Hash`.
pub trait Entity:
    Debug + Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Display name used in error messages and logs.
    const NAME: &'static str;

    fn base(&self) -> &BaseFields;

    fn base_mut(&mut self) -> &mut BaseFields;

    fn id(&self) -> Option<Id> {
        self.base().id
    }

    fn set_id(&mut self, id: Id) {
        self.base_mut().id = Some(id);
    }

    fn is_new_record(&self) -> bool {
        self.base().is_new_record()
    }

    fn active(&self) -> Option<bool> {
        self.base().active
    }

    fn map_all_properties(&self) -> bool {
        self.base().state.map_all_properties
    }

    fn set_map_all_properties(&mut self, value: bool) {
        self.base_mut().state.map_all_properties = value;
    }
}

/// Implement [`Entity`] for a struct with a `base: BaseFields` field.
///
/// ```ignore
/// impl_entity!(Department, "Department");
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $name:expr) => {
        impl $crate::Entity for $ty {
            const NAME: &'static str = $name;

            fn base(&self) -> &$crate::BaseFields {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::BaseFields {
                &mut self.base
            }
        }

        impl ::std::cmp::PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                ::std::ptr::eq(self, other) || $crate::same_identity(self.base.id, other.base.id)
            }
        }

        impl ::std::cmp::Eq for $ty {}

        impl ::std::hash::Hash for $ty {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                ::std::hash::Hash::hash(&self.base.id, state);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Sample {
        #[serde(flatten)]
        base: BaseFields,
        label: String,
    }

    crate::impl_entity!(Sample, "Sample");

    fn sample(id: Option<Id>) -> Sample {
        Sample {
            base: BaseFields {
                id,
                ..BaseFields::default()
            },
            label: "x".to_string(),
        }
    }

    #[test]
    fn test_new_record_detection() {
        assert!(sample(None).is_new_record());
        assert!(sample(Some(0)).is_new_record());
        assert!(!sample(Some(7)).is_new_record());

        let mut flagged = sample(Some(7));
        flagged.base.state.new_record = true;
        assert!(flagged.is_new_record());
    }

    #[test]
    fn test_equality_by_id_only() {
        let a = sample(Some(1));
        let mut b = sample(Some(1));
        b.label = "other".to_string();
        assert_eq!(a, b);
        assert_ne!(a, sample(Some(2)));
    }

    #[test]
    fn test_records_without_id_are_never_equal() {
        let a = sample(None);
        let twin = a.clone();
        assert_ne!(a, twin);
        assert_ne!(sample(Some(3)), sample(None));
        // the very same reference is still equal to itself
        let same = &a;
        assert!(same.eq(&a));
    }

    #[test]
    fn test_pre_persist_defaults_active_and_stamps() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut base = BaseFields::default();
        base.pre_persist(now, Some(42));

        assert_eq!(base.active, Some(true));
        assert!(base.state.new_record);
        assert_eq!(base.audit.created_at, Some(now));
        assert_eq!(base.audit.created_by, Some(42));
        assert_eq!(base.audit.updated_by, Some(42));
    }

    #[test]
    fn test_pre_update_keeps_old_active_and_creation_stamps() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut base = BaseFields::with_id(5);
        base.active = Some(false);
        base.audit.stamp_created(created, Some(1));
        base.mark_loaded();

        base.active = None;
        base.pre_update(now, Some(2));

        assert_eq!(base.active, Some(false));
        assert_eq!(base.audit.created_at, Some(created));
        assert_eq!(base.audit.created_by, Some(1));
        assert_eq!(base.audit.updated_at, Some(now));
        assert_eq!(base.audit.updated_by, Some(2));
    }

    #[test]
    fn test_mark_deleted_uses_own_id() {
        let mut base = BaseFields::with_id(5);
        assert!(!base.is_deleted());
        base.mark_deleted();
        assert_eq!(base.deleted, 5);
        assert!(base.is_deleted());
    }

    #[test]
    fn test_transient_state_is_not_serialized() {
        let mut record = sample(Some(9));
        record.base.set_status(604, "bad");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 9);
        assert_eq!(json["deleted"], 0);
        assert!(json.get("code").is_none());
        assert!(json.get("newRecord").is_none());
    }
}
