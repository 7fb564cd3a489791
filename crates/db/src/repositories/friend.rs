use sqlx::Row;

use circle_core::domain::friend::{Friend, FriendId};

use super::{decode_err, FriendRepository, RepositoryError};
use crate::DbPool;

pub struct SqlFriendRepository {
    pool: DbPool,
}

impl SqlFriendRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_friend(row: &sqlx::sqlite::SqliteRow) -> Result<Friend, RepositoryError> {
    Ok(Friend {
        id: FriendId(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        avatar_url: row.try_get("avatar_url").map_err(decode_err)?,
        strength: row.try_get("strength").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl FriendRepository for SqlFriendRepository {
    async fn list(&self) -> Result<Vec<Friend>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, avatar_url, strength FROM friends ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_friend).collect()
    }

    async fn find_by_id(&self, id: FriendId) -> Result<Option<Friend>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, avatar_url, strength FROM friends WHERE id = ?1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_friend).transpose()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM friends").fetch_one(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let pool = setup().await;
        for (name, strength) in [("Maya Chen", 0.7), ("Ava Patel", 0.9), ("Liam Ortega", 0.5)] {
            sqlx::query("INSERT INTO friends (name, avatar_url, strength) VALUES (?1, ?2, ?3)")
                .bind(name)
                .bind("https://i.pravatar.cc/100?img=1")
                .bind(strength)
                .execute(&pool)
                .await
                .expect("insert friend");
        }
        let repo = SqlFriendRepository::new(pool);

        let names: Vec<String> =
            repo.list().await.expect("list").into_iter().map(|friend| friend.name).collect();

        assert_eq!(names, vec!["Ava Patel", "Liam Ortega", "Maya Chen"]);
        assert_eq!(repo.count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn missing_friend_is_none() {
        let repo = SqlFriendRepository::new(setup().await);

        assert_eq!(repo.find_by_id(FriendId(42)).await.expect("lookup"), None);
    }
}
