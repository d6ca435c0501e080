use sqlx::Row;

use upkeep_core::domain::account::{Role, UserAccount, UserId};

use super::{AccountRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_role(s: &str) -> Role {
    match s {
        "admin" => Role::Admin,
        _ => Role::Hod,
    }
}

pub fn role_as_str(role: Role) -> &'static str {
    match role {
        Role::Hod => "hod",
        Role::Admin => "admin",
    }
}

fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<UserAccount, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let username: String =
        row.try_get("username").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: Option<String> =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_str: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let branch: Option<String> =
        row.try_get("branch").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(UserAccount { id: UserId(id), username, email, role: parse_role(&role_str), branch })
}

#[async_trait::async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, email, role, branch FROM user_account WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_account(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, email, role, branch FROM user_account WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_account(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, account: UserAccount) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_account (id, username, email, role, branch)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 email = excluded.email,
                 role = excluded.role,
                 branch = excluded.branch",
        )
        .bind(&account.id.0)
        .bind(&account.username)
        .bind(&account.email)
        .bind(role_as_str(account.role))
        .bind(&account.branch)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn admin_emails(&self) -> Result<Vec<String>, RepositoryError> {
        let emails: Vec<String> = sqlx::query_scalar(
            "SELECT email FROM user_account
             WHERE role = 'admin' AND email IS NOT NULL AND email != ''
             ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }
}

#[cfg(test)]
mod tests {
    use upkeep_core::domain::account::{Role, UserAccount, UserId};

    use super::SqlAccountRepository;
    use crate::repositories::AccountRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn account(id: &str, role: Role, email: Option<&str>) -> UserAccount {
        UserAccount {
            id: UserId(id.to_string()),
            username: id.to_string(),
            email: email.map(str::to_string),
            role,
            branch: Some("Electronics".to_string()),
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let pool = setup().await;
        let repo = SqlAccountRepository::new(pool);

        let hod = account("hod-electronics", Role::Hod, Some("hod@example.edu"));
        repo.save(hod.clone()).await.expect("save");

        let by_id =
            repo.find_by_id(&UserId("hod-electronics".to_string())).await.expect("find by id");
        assert_eq!(by_id, Some(hod.clone()));

        let by_username =
            repo.find_by_username("hod-electronics").await.expect("find by username");
        assert_eq!(by_username, Some(hod));
    }

    #[tokio::test]
    async fn admin_emails_skips_accounts_without_an_address() {
        let pool = setup().await;
        let repo = SqlAccountRepository::new(pool);

        repo.save(account("principal", Role::Admin, Some("principal@example.edu")))
            .await
            .expect("save principal");
        repo.save(account("registrar", Role::Admin, None)).await.expect("save registrar");
        repo.save(account("hod-it", Role::Hod, Some("hod-it@example.edu")))
            .await
            .expect("save hod");

        let emails = repo.admin_emails().await.expect("admin emails");
        assert_eq!(emails, vec!["principal@example.edu".to_string()]);
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlAccountRepository::new(pool);

        repo.save(account("principal", Role::Hod, None)).await.expect("save");
        repo.save(account("principal", Role::Admin, Some("principal@example.edu")))
            .await
            .expect("upsert");

        let found = repo
            .find_by_id(&UserId("principal".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.role, Role::Admin);
        assert_eq!(found.email.as_deref(), Some("principal@example.edu"));
    }
}
