use serde::{Deserialize, Serialize};
use validator::Validate;

use domain::{impl_dto, impl_entity, BaseDtoFields, BaseFields};

/// An academic department owning courses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Department {
    #[serde(flatten)]
    pub base: BaseFields,
    pub name: String,
    pub description: Option<String>,
}

impl_entity!(Department, "Department");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct DepartmentDto {
    #[serde(flatten)]
    pub base: BaseDtoFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        required(message = "Department name is required"),
        length(min = 1, max = 255, message = "Department name must be 1 to 255 characters")
    )]
    pub name: Option<String>,
    pub description: Option<String>,
}

impl_dto!(DepartmentDto);
