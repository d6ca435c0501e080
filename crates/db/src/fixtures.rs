use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_ACCOUNT_IDS: &[&str] =
    &["acct-principal", "acct-hod-electronics", "acct-hod-mechanical"];

const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        request_id: "REQ-DEMO-001",
        status: "pending",
        expected_item_count: 1,
        description: "Pending electronics request - single SSD line",
    },
    SeedRequestContract {
        request_id: "REQ-DEMO-002",
        status: "approved",
        expected_item_count: 2,
        description: "Approved mechanical request - RAM and mice",
    },
];

struct SeedRequestContract {
    request_id: &'static str,
    status: &'static str,
    expected_item_count: usize,
    description: &'static str,
}

/// Deterministic demo dataset: accounts plus two catalog-built requests.
pub struct DemoSeedDataset;

#[derive(Debug)]
pub struct SeedResult {
    pub accounts_seeded: usize,
    pub requests_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|(_, ok)| *ok)
    }
}

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            accounts_seeded: SEED_ACCOUNT_IDS.len(),
            requests_seeded: SEED_REQUESTS.iter().map(|seed| seed.request_id).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let account_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM user_account WHERE id IN (?1, ?2, ?3)",
        )
        .bind(SEED_ACCOUNT_IDS[0])
        .bind(SEED_ACCOUNT_IDS[1])
        .bind(SEED_ACCOUNT_IDS[2])
        .fetch_one(pool)
        .await?;
        checks.push(("accounts", account_count == SEED_ACCOUNT_IDS.len() as i64));

        for seed in SEED_REQUESTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM maintenance_request WHERE id = ?1 AND status = ?2)",
            )
            .bind(seed.request_id)
            .bind(seed.status)
            .fetch_one(pool)
            .await?;
            checks.push((seed.request_id, exists == 1));

            let items_json: Option<String> = sqlx::query_scalar(
                "SELECT selected_items FROM maintenance_request WHERE id = ?1",
            )
            .bind(seed.request_id)
            .fetch_optional(pool)
            .await?;
            let item_count = items_json
                .as_deref()
                .map(upkeep_core::domain::request::EquipmentList::parse_lenient)
                .map(|list| list.0.len())
                .unwrap_or(0);
            checks.push((seed.description, item_count == seed.expected_item_count));
        }

        Ok(VerificationResult { checks })
    }
}

#[cfg(test)]
mod tests {
    use super::DemoSeedDataset;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn load_then_verify_passes() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = DemoSeedDataset::load(&pool).await.expect("load fixtures");
        assert_eq!(result.accounts_seeded, 3);
        assert_eq!(result.requests_seeded.len(), 2);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify fixtures");
        assert!(verification.passed(), "failed checks: {:?}", verification.checks);
    }

    #[tokio::test]
    async fn verify_fails_on_an_empty_database() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.passed());
    }
}
