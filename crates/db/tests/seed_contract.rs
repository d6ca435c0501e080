use upkeep_db::{connect_with_settings, migrations, DemoSeedDataset};

async fn migrated_pool() -> sqlx::SqlitePool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    pool
}

#[tokio::test]
async fn seed_contract_holds_after_load() {
    let pool = migrated_pool().await;

    let result = DemoSeedDataset::load(&pool).await.expect("load seed");
    assert_eq!(result.accounts_seeded, 3);
    assert_eq!(result.requests_seeded, vec!["REQ-DEMO-001", "REQ-DEMO-002"]);

    let verification = DemoSeedDataset::verify(&pool).await.expect("verify seed");
    assert!(verification.passed(), "failed checks: {:?}", verification.checks);
}

#[tokio::test]
async fn reseeding_is_idempotent() {
    let pool = migrated_pool().await;

    DemoSeedDataset::load(&pool).await.expect("first load");
    DemoSeedDataset::load(&pool).await.expect("second load");

    let account_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_account")
        .fetch_one(&pool)
        .await
        .expect("count accounts");
    assert_eq!(account_count, 3, "reseeding must not duplicate accounts");

    let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
    assert!(verification.passed());
}

#[tokio::test]
async fn seeded_pending_request_is_listable_by_status() {
    use upkeep_core::domain::request::RequestStatus;
    use upkeep_db::repositories::{RequestRepository, SqlRequestRepository};

    let pool = migrated_pool().await;
    DemoSeedDataset::load(&pool).await.expect("load seed");

    let repo = SqlRequestRepository::new(pool);
    let pending = repo.list_by_status(RequestStatus::Pending).await.expect("list pending");

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id.0, "REQ-DEMO-001");
    assert_eq!(pending[0].items.0.len(), 1);
}
