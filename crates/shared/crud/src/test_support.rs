//! Record and DTO pair used by the unit tests.

use serde::{Deserialize, Serialize};
use validator::Validate;

use domain::{impl_dto, impl_entity, BaseDtoFields, BaseFields, Id};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ward {
    #[serde(flatten)]
    pub base: BaseFields,
    pub name: String,
    pub floor: Option<i32>,
}

impl_entity!(Ward, "Ward");

impl Ward {
    pub fn named(id: Option<Id>, name: &str) -> Self {
        Self {
            base: BaseFields {
                id,
                ..BaseFields::default()
            },
            name: name.to_string(),
            floor: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct WardDto {
    #[serde(flatten)]
    pub base: BaseDtoFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "name is required"), length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    pub floor: Option<i32>,
}

impl_dto!(WardDto);

impl WardDto {
    pub fn named(id: Option<Id>, name: &str) -> Self {
        Self {
            base: BaseDtoFields {
                id,
                ..BaseDtoFields::default()
            },
            name: Some(name.to_string()),
            floor: None,
        }
    }
}
