use std::sync::Arc;

use rfqdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use rfqdesk_core::invitation::{InvitationError, SummaryRenderer};
use rfqdesk_db::repositories::SqlDirectory;
use rfqdesk_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::audit::TracingAuditSink;
use crate::gateway::{build_gateway, GatewayError};
use crate::procurement::{Collaborators, ProcurementService, Stores};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<ProcurementService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notification gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("invitation renderer setup failed: {0}")]
    Renderer(#[from] InvitationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gateway = build_gateway(&config.notifications)?;
    let renderer = SummaryRenderer::new(&config.notifications.response_base_url)?;
    let directory = Arc::new(SqlDirectory::new(db_pool.clone()));
    let service = ProcurementService::new(
        Stores::sql(db_pool.clone()),
        Collaborators {
            catalog: directory.clone(),
            projects: directory.clone(),
            suppliers: directory,
            gateway,
            audit: Arc::new(TracingAuditSink),
        },
        renderer,
    );
    info!(
        event_name = "system.bootstrap.service_ready",
        correlation_id = "bootstrap",
        notification_mode = ?config.notifications.mode,
        "procurement service initialized"
    );

    Ok(Application { config, db_pool, service: Arc::new(service) })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rfqdesk_core::config::{ConfigOverrides, LoadOptions, NotificationMode};
    use rfqdesk_core::domain::party::{ProjectId, SupplierId};
    use rfqdesk_core::domain::rfq::RfqStatus;
    use rfqdesk_db::DemoDirectorySeed;

    use crate::bootstrap::bootstrap;
    use crate::procurement::{tests::plywood, CreateRfqRequest, RequestContext};

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_webhook_mode_has_no_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                notification_mode: Some(NotificationMode::Webhook),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("webhook_url"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrapped_service_publishes_against_the_seeded_directory() {
        let app = bootstrap(overrides("sqlite::memory:")).await.expect("bootstrap should succeed");
        DemoDirectorySeed::load(&app.db_pool).await.expect("seed demo directory");
        let ctx = RequestContext::new("req-bootstrap", "integration");

        let draft = app
            .service
            .create_draft(
                &ctx,
                CreateRfqRequest {
                    project_id: ProjectId("PRJ-TOWER-A".to_owned()),
                    delivery_location: None,
                    bidding_start: NaiveDate::from_ymd_opt(2026, 3, 1),
                    bidding_end: NaiveDate::from_ymd_opt(2026, 3, 5),
                    delivery_date: NaiveDate::from_ymd_opt(2026, 3, 10),
                    terms: None,
                    supplier_ids: vec![SupplierId("SUP-TIMBER".to_owned())],
                    materials: vec![plywood()],
                },
            )
            .await
            .expect("create draft");
        let outcome = app.service.publish(&ctx, &draft.id, None).await.expect("publish");

        assert_eq!(outcome.rfq.status, RfqStatus::Published);
        assert_eq!(outcome.dispatch.deliveries.len(), 1);
        let stored = app.service.get_rfq(&draft.id).await.expect("reload");
        assert_eq!(stored.materials.len(), 1);
        assert_eq!(stored.version, 2);

        app.db_pool.close().await;
    }
}
