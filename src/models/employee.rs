use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::department::Department;

#[derive(sqlx::FromRow, Debug)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub birthyear: i32,
}

/// One row of the employee/department join; department columns are null
/// for employees without memberships.
#[derive(sqlx::FromRow, Debug)]
pub struct EmployeeMembershipRow {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub birthyear: i32,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub department_path: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub birth_year: u16,
    pub departments: Vec<Department>,
}

#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewEmployee {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub surname: String,
    pub birth_year: u16,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub department_ids: Vec<String>,
}

#[derive(Deserialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmployeeUpdate {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub surname: Option<String>,
    pub birth_year: Option<u16>,
    /// `None` leaves memberships untouched; `Some(vec![])` clears them.
    #[validate(length(max = 256))]
    pub department_ids: Option<Vec<String>>,
}
