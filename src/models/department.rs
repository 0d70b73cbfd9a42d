use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::path;

#[derive(sqlx::FromRow, Debug)]
pub struct DepartmentRow {
    pub id: Uuid,
    pub name: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    /// Derived from `path`; `None` for roots.
    pub parent_id: Option<Uuid>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        let parent_id = path::parent_id(&row.path);
        Department {
            id: row.id,
            name: row.name,
            path: row.path,
            parent_id,
        }
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub id: Uuid,
    pub name: String,
    pub direct_employee_count: i64,
    pub subtree_employee_count: i64,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewDepartment {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub parent_id: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepartmentUpdate {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub parent_id: Option<String>,
}
