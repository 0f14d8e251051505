use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_PROJECT_IDS: &[&str] = &["PRJ-TOWER-A", "PRJ-WAREHOUSE", "PRJ-CLINIC"];

const SEED_SUPPLIER_IDS: &[&str] =
    &["SUP-TIMBER", "SUP-STEEL", "SUP-CEMENT", "SUP-NOMAIL", "SUP-BADMAIL"];

const SEED_MATERIAL_IDS: &[&str] = &[
    "CAT-PLY-18",
    "CAT-PLY-12",
    "CAT-TMT-12",
    "CAT-TMT-16",
    "CAT-OPC-53",
    "CAT-PPC",
    "CAT-WIRE-25",
    "CAT-MCB-32",
];

/// Demo projects, suppliers and catalog materials for local runs.
///
/// Two suppliers are deliberately unreachable (no email, malformed email) so
/// publish validation can be exercised against seeded data.
pub struct DemoDirectorySeed;

impl DemoDirectorySeed {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_directory.sql");

    /// Loads the demo rows, replacing any previous copies.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult {
            projects: SEED_PROJECT_IDS.len(),
            suppliers: SEED_SUPPLIER_IDS.len(),
            materials: SEED_MATERIAL_IDS.len(),
        })
    }

    /// Checks that every seeded row is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();
        for (table, ids) in [
            ("project", SEED_PROJECT_IDS),
            ("supplier", SEED_SUPPLIER_IDS),
            ("catalog_material", SEED_MATERIAL_IDS),
        ] {
            for id in ids {
                let exists: i64 = sqlx::query_scalar(&format!(
                    "SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"
                ))
                .bind(*id)
                .fetch_one(pool)
                .await?;
                checks.push((*id, exists == 1));
            }
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows. RFQs referencing them are left alone.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for (table, ids) in [
            ("project", SEED_PROJECT_IDS),
            ("supplier", SEED_SUPPLIER_IDS),
            ("catalog_material", SEED_MATERIAL_IDS),
        ] {
            let quoted = sql_array_from_ids(ids);
            sqlx::query(&format!("DELETE FROM {table} WHERE id IN {quoted}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub projects: usize,
    pub suppliers: usize,
    pub materials: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_covers_every_seeded_id() {
        for id in SEED_PROJECT_IDS.iter().chain(SEED_SUPPLIER_IDS).chain(SEED_MATERIAL_IDS) {
            assert!(DemoDirectorySeed::SQL.contains(&format!("'{id}'")), "{id} missing from fixture");
        }
    }

    #[tokio::test]
    async fn seed_is_verifiable_and_rerunnable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoDirectorySeed::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoDirectorySeed::verify(&pool).await.expect("verify");
        assert!(first_verification.all_present);
        assert_eq!(first, SeedResult { projects: 3, suppliers: 5, materials: 8 });

        DemoDirectorySeed::load(&pool).await.expect("reload seed fixtures");
        let second_verification = DemoDirectorySeed::verify(&pool).await.expect("re-verify");
        assert_eq!(first_verification.checks, second_verification.checks);

        let suppliers: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM supplier")
            .fetch_one(&pool)
            .await
            .expect("count suppliers");
        assert_eq!(suppliers, 5);

        DemoDirectorySeed::clean(&pool).await.expect("clean");
        assert!(!DemoDirectorySeed::verify(&pool).await.expect("verify after clean").all_present);
    }
}
