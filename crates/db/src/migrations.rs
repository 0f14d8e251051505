use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] = &[
        "project",
        "supplier",
        "catalog_material",
        "rfq",
        "rfq_supplier",
        "material_line",
        "material_status_change",
        "supplier_response",
        "notification_attempt",
        "idempotency_record",
    ];

    const MANAGED_INDEXES: &[&str] = &[
        "idx_catalog_material_category",
        "idx_rfq_project_id",
        "idx_rfq_status",
        "idx_material_line_rfq_id",
        "idx_material_line_status",
        "idx_material_status_change_line_id",
        "idx_supplier_response_rfq_id",
        "idx_notification_attempt_rfq_id",
        "idx_idempotency_record_rfq_id",
    ];

    async fn table_count(pool: &sqlx::SqlitePool, name: &str) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|error| panic!("check {name} table: {error}"))
        .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn migrations_create_procurement_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 1, "{table} should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 0, "{table} should be dropped");
        }
    }

    #[tokio::test]
    async fn deleting_an_rfq_cascades_to_its_children() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::raw_sql(
            "INSERT INTO rfq (id, number, project_id, status, created_at, updated_at)
                VALUES ('RFQ-1', 1, 'PRJ-1', 'published', '2026-03-01T00:00:00Z', '2026-03-01T00:00:00Z');
             INSERT INTO rfq_supplier (rfq_id, supplier_id, position) VALUES ('RFQ-1', 'SUP-1', 0);
             INSERT INTO material_line (id, rfq_id, position, name, unit, quantity, status)
                VALUES ('ML-1', 'RFQ-1', 0, 'Plywood 18mm', 'sheet', '50', 'pending');
             INSERT INTO supplier_response (id, rfq_id, supplier_id, submitted_at, tax_rate, quotes_json, status)
                VALUES ('RSP-1', 'RFQ-1', 'SUP-1', '2026-03-02T00:00:00Z', '18', '[]', 'submitted');
             INSERT INTO notification_attempt (rfq_id, supplier_id, email, delivered, attempted_at)
                VALUES ('RFQ-1', 'SUP-1', 'a@b.in', 1, '2026-03-01T00:00:00Z');",
        )
        .execute(&pool)
        .await
        .expect("insert rows");

        sqlx::query("DELETE FROM rfq WHERE id = 'RFQ-1'").execute(&pool).await.expect("delete");

        for table in ["rfq_supplier", "material_line", "supplier_response", "notification_attempt"] {
            let remaining: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&pool)
                .await
                .expect("count");
            assert_eq!(remaining, 0, "{table} rows should cascade");
        }
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            initial_signature.len(),
            MANAGED_TABLES.len() + MANAGED_INDEXES.len(),
            "initial migration pass should create all managed schema objects",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let after_down_signature = managed_schema_signature(&pool).await;
        assert!(
            after_down_signature.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.expect("re-run migrations");

        let after_second_up_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            after_second_up_signature, initial_signature,
            "up/down/up should preserve migration-managed schema signature",
        );
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            let managed = MANAGED_TABLES.contains(&name.as_str())
                || MANAGED_INDEXES.contains(&name.as_str());
            managed.then(|| (row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
        })
        .collect();
        signature.sort();
        signature
    }
}
