use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use circle_core::domain::product::{Product, ProductId};

use super::{decode_err, ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Prices are stored as decimal text.
pub(crate) fn parse_price(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|error| RepositoryError::Decode(format!("invalid price `{raw}`: {error}")))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let price: String = row.try_get("price").map_err(decode_err)?;
    Ok(Product {
        id: ProductId(row.try_get("id").map_err(decode_err)?),
        title: row.try_get("title").map_err(decode_err)?,
        brand: row.try_get("brand").map_err(decode_err)?,
        category: row.try_get("category").map_err(decode_err)?,
        price: parse_price(&price)?,
        description: row.try_get("description").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, brand, category, price, description FROM products WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?)
    }
}
