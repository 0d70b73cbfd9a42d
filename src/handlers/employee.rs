use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::AppError;
use crate::handlers::log_failure;
use crate::models::employee::{EmployeeUpdate, NewEmployee};
use crate::store::EmployeeStore;
use crate::utils::validation::validate_payload;

pub async fn create_employee(
    store: web::Data<EmployeeStore>,
    new_employee: web::Json<NewEmployee>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*new_employee)?;

    let employee = store
        .create(
            &new_employee.name,
            &new_employee.surname,
            new_employee.birth_year,
            &new_employee.department_ids,
        )
        .await
        .map_err(|err| {
            log_failure("Employee creation", &err);
            err
        })?;

    log::info!(
        "Created employee {} in {} department(s)",
        employee.id,
        employee.departments.len()
    );
    Ok(HttpResponse::Created().json(employee))
}

pub async fn get_employees(store: web::Data<EmployeeStore>) -> Result<HttpResponse, AppError> {
    let employees = store.get_all().await.map_err(|err| {
        log_failure("Employee listing", &err);
        err
    })?;

    Ok(HttpResponse::Ok().json(employees))
}

pub async fn get_employee(
    store: web::Data<EmployeeStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee = store.get_by_id(&employee_id).await.map_err(|err| {
        log_failure("Employee lookup", &err);
        err
    })?;

    Ok(HttpResponse::Ok().json(employee))
}

pub async fn update_employee(
    store: web::Data<EmployeeStore>,
    employee_id: web::Path<String>,
    updates: web::Json<EmployeeUpdate>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*updates)?;

    let employee = store
        .update(&employee_id, &updates)
        .await
        .map_err(|err| {
            log_failure("Employee update", &err);
            err
        })?;

    Ok(HttpResponse::Ok().json(employee))
}

pub async fn delete_employee(
    store: web::Data<EmployeeStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    store.delete(&employee_id).await.map_err(|err| {
        log_failure("Employee deletion", &err);
        err
    })?;

    log::info!("Deleted employee {}", employee_id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
    })))
}
