pub mod department;
pub mod employee;
pub mod health;

use actix_web::{web, ResponseError};

use crate::errors::AppError;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(web::resource("/heartbeat").route(web::get().to(health::heartbeat)))
    .service(
        web::resource("/v1/department")
            .route(web::post().to(department::create_department))
            .route(web::get().to(department::get_departments)),
    )
    .service(
        web::resource("/v1/department/hierarchy")
            .route(web::get().to(department::get_hierarchy)),
    )
    .service(
        web::resource("/v1/department/{id}")
            .route(web::get().to(department::get_department))
            .route(web::patch().to(department::update_department))
            .route(web::delete().to(department::delete_department)),
    )
    .service(
        web::resource("/v1/department/{id}/employees")
            .route(web::get().to(department::get_department_employees)),
    )
    .service(
        web::resource("/v1/department/{id}/employees/all")
            .route(web::get().to(department::get_hierarchy_employees)),
    )
    .service(
        web::resource("/v1/employee")
            .route(web::post().to(employee::create_employee))
            .route(web::get().to(employee::get_employees)),
    )
    .service(
        web::resource("/v1/employee/{id}")
            .route(web::get().to(employee::get_employee))
            .route(web::patch().to(employee::update_employee))
            .route(web::delete().to(employee::delete_employee)),
    );
}

/// Client mistakes are logged at warn, everything else at error.
fn log_failure(action: &str, err: &AppError) {
    if err.status_code().is_client_error() {
        log::warn!("{} rejected: {}", action, err);
    } else {
        log::error!("{} failed: {}", action, err);
    }
}
