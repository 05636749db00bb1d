//! Organization access inspection binary.

#![forbid(unsafe_code)]

mod cli_config;

use std::sync::Arc;

use orgaccess_application::AccessService;
use orgaccess_core::{AppError, AppResult};
use orgaccess_infrastructure::{
    AccessFixture, InMemoryAccessCache, PostgresAccessGrantRepository,
    PostgresOrganizationRepository, StaticGlobalAdminCheck,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli_config::{CliCommand, CliConfig, SnapshotSource};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CliConfig::load()?;

    let (user_id, organization_id) = match config.command.clone() {
        CliCommand::Migrate => {
            let SnapshotSource::Postgres { database_url } = &config.source else {
                return Err(AppError::Validation(
                    "migrate requires DATABASE_URL".to_owned(),
                ));
            };
            connect_and_migrate(database_url.as_str()).await?;
            info!("database migrations applied successfully");
            return Ok(());
        }
        CliCommand::Resolve {
            user_id,
            organization_id,
        } => (user_id, organization_id),
    };

    let access_service = build_access_service(&config).await?;

    info!(
        user_id = %user_id,
        evaluated_at = %config.evaluated_at,
        cache_ttl_seconds = config.cache_ttl_seconds,
        "resolving organization access"
    );

    let output = match organization_id {
        Some(organization_id) => {
            let grant = access_service
                .resolve_organization_access(&user_id, &organization_id, config.evaluated_at)
                .await?;
            serde_json::to_string_pretty(&grant)
        }
        None => {
            let grants = access_service
                .list_accessible_organizations_for_user(&user_id, config.evaluated_at)
                .await?;
            serde_json::to_string_pretty(&grants)
        }
    }
    .map_err(|error| AppError::Internal(format!("failed to encode access output: {error}")))?;

    println!("{output}");

    Ok(())
}

async fn build_access_service(config: &CliConfig) -> AppResult<AccessService> {
    let configured_admins = config
        .global_admin_user_ids
        .as_deref()
        .map(StaticGlobalAdminCheck::from_comma_separated)
        .transpose()?;

    let access_service = match &config.source {
        SnapshotSource::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url.as_str()).await?;
            let grant_repository = Arc::new(PostgresAccessGrantRepository::new(pool.clone()));

            AccessService::new(
                Arc::new(PostgresOrganizationRepository::new(pool)),
                grant_repository.clone(),
                grant_repository,
                Arc::new(configured_admins.unwrap_or_default()),
            )
        }
        SnapshotSource::Fixture { path } => {
            let fixture = AccessFixture::load(path).await?;
            let admin_check = configured_admins.unwrap_or_else(|| fixture.global_admin_check());
            let repository = Arc::new(fixture.into_repository());

            AccessService::new(
                repository.clone(),
                repository.clone(),
                repository,
                Arc::new(admin_check),
            )
        }
    };

    Ok(access_service.with_access_cache(
        Arc::new(InMemoryAccessCache::new()),
        config.cache_ttl_seconds,
    ))
}

async fn connect_and_migrate(database_url: &str) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
