use serde::{Deserialize, Serialize};
use validator::Validate;

use domain::{impl_dto, impl_entity, BaseDtoFields, BaseFields, Id};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Course {
    #[serde(flatten)]
    pub base: BaseFields,
    pub title: String,
    pub description: Option<String>,
    pub credits: i32,
    pub department_id: Id,
}

impl_entity!(Course, "Course");

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseDto {
    #[serde(flatten)]
    pub base: BaseDtoFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        required(message = "Course title is required"),
        length(min = 1, max = 255, message = "Course title must be 1 to 255 characters")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, max = 60, message = "Credits must be between 0 and 60"))]
    pub credits: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Department is required"))]
    pub department_id: Option<Id>,
    /// Filled when all properties are mapped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

impl_dto!(CourseDto);
