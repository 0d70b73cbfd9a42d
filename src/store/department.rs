use sqlx::postgres::PgExecutor;
use sqlx::{PgConnection, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::department::{Department, DepartmentRow, DepartmentSummary};
use crate::models::employee::Employee;
use crate::store::employee::{fetch_employees, EmployeeFilter};
use crate::store::with_deadline;
use crate::utils::path;

#[derive(Clone)]
pub struct DepartmentStore {
    pool: PgPool,
    deadline: Duration,
}

impl DepartmentStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        DepartmentStore { pool, deadline }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Department, AppError> {
        let id = parse_department_id(id)?;
        with_deadline(self.deadline, async {
            Ok(find_department(&self.pool, id).await?.into())
        })
        .await
    }

    /// Creates a root department, or a child when `parent_id` is given.
    ///
    /// The parent row is share-locked for the duration of the insert so a
    /// concurrent [`DepartmentStore::delete`] of the parent either waits for
    /// this child or makes the lookup fail.
    pub async fn create(&self, name: &str, parent_id: Option<&str>) -> Result<Department, AppError> {
        let parent_id = parent_id.map(parse_parent_id).transpose()?;

        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;

            let parent_path = match parent_id {
                Some(parent_id) => lock_parent(&mut tx, parent_id).await?.path,
                None => String::new(),
            };

            let id = Uuid::new_v4();
            let path = path::child_path(&parent_path, &path::compute_segment(&id.to_string()));

            let row = sqlx::query_as::<_, DepartmentRow>(
                "INSERT INTO departments (id, name, path) VALUES ($1, $2, $3::ltree) \
                 RETURNING id, name, path::text AS path",
            )
            .bind(id)
            .bind(name)
            .bind(&path)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(row.into())
        })
        .await
    }

    /// Renames and/or reparents a department. On reparent the whole subtree
    /// moves with it: every descendant path is rewritten under the new prefix
    /// in the same transaction.
    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Department, AppError> {
        let id = parse_department_id(id)?;
        let parent_id = parent_id.map(parse_parent_id).transpose()?;

        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;
            let current = lock_department(&mut tx, id).await?;

            let mut new_path = current.path.clone();
            if let Some(parent_id) = parent_id {
                let parent = lock_parent(&mut tx, parent_id).await?;
                if path::is_descendant(&parent.path, &current.path) {
                    return Err(AppError::InvalidParent(
                        "Department cannot be moved under itself or its descendants".to_string(),
                    ));
                }
                new_path = path::child_path(&parent.path, &path::compute_segment(&id.to_string()));
            }

            if new_path != current.path {
                sqlx::query(
                    "UPDATE departments \
                     SET path = $1::ltree || subpath(path, nlevel($2::ltree)) \
                     WHERE path <@ $2::ltree AND id <> $3",
                )
                .bind(&new_path)
                .bind(&current.path)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }

            let row = sqlx::query_as::<_, DepartmentRow>(
                "UPDATE departments SET name = $1, path = $2::ltree WHERE id = $3 \
                 RETURNING id, name, path::text AS path",
            )
            .bind(name.unwrap_or(&current.name))
            .bind(&new_path)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(row.into())
        })
        .await
    }

    /// Root departments only, ordered by name.
    pub async fn hierarchy(&self) -> Result<Vec<Department>, AppError> {
        with_deadline(self.deadline, async {
            let rows = sqlx::query_as::<_, DepartmentRow>(
                "SELECT id, name, path::text AS path FROM departments \
                 WHERE nlevel(path) = 1 ORDER BY name, id",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(Department::from).collect())
        })
        .await
    }

    pub async fn list_all_with_counts(&self) -> Result<Vec<DepartmentSummary>, AppError> {
        with_deadline(self.deadline, async {
            let summaries = sqlx::query_as::<_, DepartmentSummary>(
                r#"
                SELECT
                    d.id,
                    d.name,
                    (SELECT COUNT(*) FROM employee_department ed
                        WHERE ed.department_id = d.id) AS direct_employee_count,
                    (SELECT COUNT(*) FROM employee_department ed
                        JOIN departments sub ON sub.id = ed.department_id
                        WHERE sub.path <@ d.path) AS subtree_employee_count
                FROM departments d
                ORDER BY d.name, d.id
                "#,
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(summaries)
        })
        .await
    }

    /// Deletes a leaf department together with its memberships.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = parse_department_id(id)?;

        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;
            let current = lock_department(&mut tx, id).await?;

            let has_descendants: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM departments WHERE path <@ $1::ltree AND id <> $2)",
            )
            .bind(&current.path)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if has_descendants {
                return Err(AppError::HasDescendants(
                    "Cannot delete department with descendants".to_string(),
                ));
            }

            sqlx::query("DELETE FROM employee_department WHERE department_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM departments WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn employees_by_department(&self, id: &str) -> Result<Vec<Employee>, AppError> {
        let id = parse_department_id(id)?;
        self.employees_matching(id, |department| EmployeeFilter::Department(department.id))
            .await
    }

    pub async fn employees_in_hierarchy(&self, id: &str) -> Result<Vec<Employee>, AppError> {
        let id = parse_department_id(id)?;
        self.employees_matching(id, |department| EmployeeFilter::Subtree(department.path))
            .await
    }

    /// Resolves the department and lists its employees from one snapshot,
    /// both under a single deadline.
    async fn employees_matching<F>(&self, id: Uuid, filter: F) -> Result<Vec<Employee>, AppError>
    where
        F: FnOnce(DepartmentRow) -> EmployeeFilter,
    {
        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await?;

            let department = find_department(&mut *tx, id).await?;
            let employees = fetch_employees(&mut *tx, filter(department)).await?;

            tx.commit().await?;
            Ok(employees)
        })
        .await
    }
}

fn parse_department_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::NotFound(format!("Department {} not found", raw)))
}

fn parse_parent_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidParent(format!("Invalid parent department ID: {}", raw)))
}

fn department_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Department {} not found", id))
}

async fn find_department<'e, E>(executor: E, id: Uuid) -> Result<DepartmentRow, AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name, path::text AS path FROM departments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| department_not_found(id))
}

async fn lock_department(conn: &mut PgConnection, id: Uuid) -> Result<DepartmentRow, AppError> {
    sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name, path::text AS path FROM departments WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| department_not_found(id))
}

async fn lock_parent(conn: &mut PgConnection, id: Uuid) -> Result<DepartmentRow, AppError> {
    sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name, path::text AS path FROM departments WHERE id = $1 FOR SHARE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::InvalidParent(format!("Parent department {} not found", id)))
}
