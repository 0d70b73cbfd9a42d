use sqlx::postgres::PgExecutor;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::department::DepartmentRow;
use crate::models::employee::{Employee, EmployeeMembershipRow, EmployeeRow, EmployeeUpdate};
use crate::store::membership;
use crate::store::with_deadline;

const FOREIGN_KEY_VIOLATION: &str = "23503";

const SELECT_EMPLOYEES: &str = r#"
    SELECT
        e.id,
        e.name,
        e.surname,
        e.birthyear,
        d.id AS department_id,
        d.name AS department_name,
        d.path::text AS department_path
    FROM employees e
    LEFT JOIN employee_department ed ON ed.employee_id = e.id
    LEFT JOIN departments d ON d.id = ed.department_id
"#;

/// Which employees [`fetch_employees`] returns. Matching employees always
/// come back with their full department set.
#[derive(Debug, Clone)]
pub(crate) enum EmployeeFilter {
    All,
    Id(Uuid),
    /// Direct members of a department.
    Department(Uuid),
    /// Members of any department contained by this path.
    Subtree(String),
}

#[derive(Clone)]
pub struct EmployeeStore {
    pool: PgPool,
    deadline: Duration,
}

impl EmployeeStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        EmployeeStore { pool, deadline }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Employee, AppError> {
        let id = parse_employee_id(id)?;
        with_deadline(self.deadline, async {
            fetch_employees(&self.pool, EmployeeFilter::Id(id))
                .await?
                .pop()
                .ok_or_else(|| employee_not_found(id))
        })
        .await
    }

    /// Inserts the employee and its memberships in one transaction.
    pub async fn create(
        &self,
        name: &str,
        surname: &str,
        birth_year: u16,
        department_ids: &[String],
    ) -> Result<Employee, AppError> {
        let department_ids = membership::parse_department_ids(department_ids)?;

        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;
            let id = Uuid::new_v4();

            sqlx::query("INSERT INTO employees (id, name, surname, birthyear) VALUES ($1, $2, $3, $4)")
                .bind(id)
                .bind(name)
                .bind(surname)
                .bind(i32::from(birth_year))
                .execute(&mut *tx)
                .await?;

            insert_memberships(&mut tx, id, &department_ids).await?;

            let employee = fetch_employees(&mut *tx, EmployeeFilter::Id(id))
                .await?
                .pop()
                .ok_or_else(|| employee_not_found(id))?;

            tx.commit().await?;
            Ok(employee)
        })
        .await
    }

    /// Employees ordered by id, each with its departments.
    pub async fn get_all(&self) -> Result<Vec<Employee>, AppError> {
        with_deadline(self.deadline, fetch_employees(&self.pool, EmployeeFilter::All)).await
    }

    /// Applies scalar changes and reconciles memberships against the
    /// requested set, inserting and deleting only the difference. Scalars and
    /// memberships commit together.
    pub async fn update(&self, id: &str, changes: &EmployeeUpdate) -> Result<Employee, AppError> {
        let id = parse_employee_id(id)?;

        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;

            // Row lock serializes concurrent updates of the same employee.
            let mut employee = sqlx::query_as::<_, EmployeeRow>(
                "SELECT id, name, surname, birthyear FROM employees WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| employee_not_found(id))?;

            if let Some(name) = &changes.name {
                employee.name = name.clone();
            }
            if let Some(surname) = &changes.surname {
                employee.surname = surname.clone();
            }
            if let Some(birth_year) = changes.birth_year {
                employee.birthyear = i32::from(birth_year);
            }

            sqlx::query("UPDATE employees SET name = $1, surname = $2, birthyear = $3 WHERE id = $4")
                .bind(&employee.name)
                .bind(&employee.surname)
                .bind(employee.birthyear)
                .bind(employee.id)
                .execute(&mut *tx)
                .await?;

            if let Some(requested) = &changes.department_ids {
                let current: Vec<Uuid> = sqlx::query_scalar(
                    "SELECT department_id FROM employee_department WHERE employee_id = $1",
                )
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

                let plan = membership::plan(&current, requested)?;
                insert_memberships(&mut tx, id, &plan.insert).await?;
                delete_memberships(&mut tx, id, &plan.delete).await?;
            }

            let updated = fetch_employees(&mut *tx, EmployeeFilter::Id(id))
                .await?
                .pop()
                .ok_or_else(|| employee_not_found(id))?;

            tx.commit().await?;
            Ok(updated)
        })
        .await
    }

    /// Removes the employee's memberships explicitly, then the employee.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = parse_employee_id(id)?;

        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;

            let exists: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(employee_not_found(id));
            }

            sqlx::query("DELETE FROM employee_department WHERE employee_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM employees WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }
}

fn parse_employee_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::NotFound(format!("Employee {} not found", raw)))
}

fn employee_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Employee {} not found", id))
}

pub(crate) async fn fetch_employees<'e, E>(
    executor: E,
    filter: EmployeeFilter,
) -> Result<Vec<Employee>, AppError>
where
    E: PgExecutor<'e>,
{
    let mut query = QueryBuilder::<Postgres>::new(SELECT_EMPLOYEES);

    match filter {
        EmployeeFilter::All => {}
        EmployeeFilter::Id(id) => {
            query.push(" WHERE e.id = ").push_bind(id);
        }
        EmployeeFilter::Department(department_id) => {
            query
                .push(
                    " WHERE e.id IN (SELECT m.employee_id FROM employee_department m \
                     WHERE m.department_id = ",
                )
                .push_bind(department_id)
                .push(")");
        }
        EmployeeFilter::Subtree(path) => {
            query
                .push(
                    " WHERE e.id IN (SELECT m.employee_id FROM employee_department m \
                     JOIN departments sub ON sub.id = m.department_id WHERE sub.path <@ ",
                )
                .push_bind(path)
                .push("::ltree)");
        }
    }

    query.push(" ORDER BY e.id, d.name, d.id");

    let rows = query
        .build_query_as::<EmployeeMembershipRow>()
        .fetch_all(executor)
        .await?;

    group_memberships(rows)
}

/// Folds join rows (sorted by employee id) into employees.
fn group_memberships(rows: Vec<EmployeeMembershipRow>) -> Result<Vec<Employee>, AppError> {
    let mut employees: Vec<Employee> = Vec::new();

    for row in rows {
        if employees.last().map(|e| e.id) != Some(row.id) {
            employees.push(Employee {
                id: row.id,
                name: row.name,
                surname: row.surname,
                birth_year: birth_year(row.birthyear)?,
                departments: Vec::new(),
            });
        }

        if let (Some(id), Some(name), Some(path), Some(employee)) = (
            row.department_id,
            row.department_name,
            row.department_path,
            employees.last_mut(),
        ) {
            employee.departments.push(DepartmentRow { id, name, path }.into());
        }
    }

    Ok(employees)
}

fn birth_year(stored: i32) -> Result<u16, AppError> {
    u16::try_from(stored).map_err(|_| {
        AppError::InternalServerError(format!("Stored birth year {} is out of range", stored))
    })
}

async fn insert_memberships(
    conn: &mut PgConnection,
    employee_id: Uuid,
    department_ids: &[Uuid],
) -> Result<(), AppError> {
    if department_ids.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::<Postgres>::new("INSERT INTO employee_department (employee_id, department_id) ");
    query.push_values(department_ids, |mut row, department_id| {
        row.push_bind(employee_id).push_bind(*department_id);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(membership_error)?;
    Ok(())
}

async fn delete_memberships(
    conn: &mut PgConnection,
    employee_id: Uuid,
    department_ids: &[Uuid],
) -> Result<(), AppError> {
    if department_ids.is_empty() {
        return Ok(());
    }

    sqlx::query("DELETE FROM employee_department WHERE employee_id = $1 AND department_id = ANY($2)")
        .bind(employee_id)
        .bind(department_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// An unknown department surfaces as a foreign key violation.
fn membership_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return AppError::InvalidDepartment("Department does not exist".to_string());
        }
    }
    AppError::from(err)
}
