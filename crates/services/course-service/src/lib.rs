//! Course Service Library
//!
//! Departments and the courses they own, served over REST on top of the
//! generic CRUD layer.

pub mod config;
pub mod infra;
pub mod model;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use crud::{CachedRepository, JwtAuthenticator, SeaOrmRepository};

use crate::config::CourseServiceConfig;
use crate::infra::Database;
use crate::repository::{CourseTable, DepartmentTable};
use crate::routes::create_router;
use crate::state::{AppState, CourseRepository, DepartmentRepository};

/// Cache region of department lookups.
pub const DEPARTMENT_CACHE_REGION: &str = "department";
pub const COURSE_CACHE_REGION: &str = "course";

/// Run the HTTP server.
pub async fn run_server(host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = CourseServiceConfig::from_env();
    run_server_with_config(host, port, config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = CourseServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            for (name, applied) in db.migration_status().await? {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Resetting database");
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

async fn run_server_with_config(
    host: &str,
    port: u16,
    config: CourseServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;
    let cache = crud::cache::connect(&config.cache).await?;

    let departments: DepartmentRepository = Arc::new(CachedRepository::new(
        SeaOrmRepository::<DepartmentTable>::new(db.get_connection()),
        Arc::clone(&cache),
        DEPARTMENT_CACHE_REGION,
    ));
    let courses: CourseRepository = Arc::new(CachedRepository::new(
        SeaOrmRepository::<CourseTable>::new(db.get_connection()),
        cache,
        COURSE_CACHE_REGION,
    ));
    let authenticator = Arc::new(JwtAuthenticator::new(&config.jwt));

    let state = AppState::new(departments, courses, authenticator)?.with_database(db);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(service = %config.service.service_name, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
