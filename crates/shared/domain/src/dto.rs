//! Wire-facing projection of a record.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::Validate;

use crate::entity::{AuditFields, Id};

/// Properties shared by every DTO.
///
/// Audit stamps and the `code`/`message` status are output only: the status
/// is never read from input and audit stamps are ignored when mapping back to
/// a record. `strictly_search` is input only and `language` is request-scoped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseDtoFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub audit: AuditFields,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing)]
    pub strictly_search: Option<bool>,
    #[serde(skip)]
    pub language: Option<String>,
}

/// A DTO paired with a record type by a mapping service.
///
/// Implement with [`impl_dto!`](crate::impl_dto).
pub trait Dto:
    Debug + Clone + Default + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    fn base(&self) -> &BaseDtoFields;

    fn base_mut(&mut self) -> &mut BaseDtoFields;

    fn id(&self) -> Option<Id> {
        self.base().id
    }

    fn set_id(&mut self, id: Id) {
        self.base_mut().id = Some(id);
    }

    fn active(&self) -> Option<bool> {
        self.base().active
    }

    fn set_active(&mut self, active: Option<bool>) {
        self.base_mut().active = active;
    }

    /// Attach a per-item status (batch results).
    fn set_status(&mut self, code: Option<i32>, message: Option<String>) {
        let base = self.base_mut();
        base.code = code;
        base.message = message;
    }

    fn language(&self) -> Option<&str> {
        self.base().language.as_deref()
    }

    fn set_language(&mut self, language: impl Into<String>) {
        self.base_mut().language = Some(language.into());
    }

    fn strictly_search(&self) -> bool {
        self.base().strictly_search.unwrap_or(false)
    }
}

/// Implement [`Dto`] for a struct with a `base: BaseDtoFields` field, plus
/// id-based equality.
#[macro_export]
macro_rules! impl_dto {
    ($ty:ty) => {
        impl $crate::Dto for $ty {
            fn base(&self) -> &$crate::BaseDtoFields {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::BaseDtoFields {
                &mut self.base
            }
        }

        impl ::std::cmp::PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                ::std::ptr::eq(self, other) || $crate::same_identity(self.base.id, other.base.id)
            }
        }
    };
}
