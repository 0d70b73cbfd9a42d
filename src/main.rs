mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod store;
mod utils;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use std::io;

use crate::config::Config;
use crate::store::{DepartmentStore, EmployeeStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {}", err);
            return Err(io::Error::new(io::ErrorKind::InvalidInput, err));
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let pool = db::create_pool(&config.db).await.map_err(|err| {
        error!("Failed to connect to the database: {}", err);
        io::Error::new(io::ErrorKind::ConnectionRefused, err)
    })?;

    if config.db.run_migrations {
        db::run_migrations(&pool).await.map_err(|err| {
            error!("Failed to apply migrations: {}", err);
            io::Error::new(io::ErrorKind::Other, err)
        })?;
        info!("Database schema is up to date");
    }

    let departments = web::Data::new(DepartmentStore::new(pool.clone(), config.request_timeout));
    let employees = web::Data::new(EmployeeStore::new(pool.clone(), config.request_timeout));

    info!("Starting server at {}", config.api_host);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %a %Dms"))
            .app_data(departments.clone())
            .app_data(employees.clone())
            .configure(handlers::routes)
    })
    .shutdown_timeout(config.shutdown_timeout.as_secs())
    .bind(&config.api_host)?
    .run()
    .await?;

    info!("Server stopped, closing database pool");
    pool.close().await;
    Ok(())
}
