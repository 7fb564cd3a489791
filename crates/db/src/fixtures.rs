//! Deterministic demo dataset: one user, twenty friends, a product catalog, and a few
//! weeks of friend activity, plus the event vectors derived from it.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::info;

use circle_core::domain::event::{EventId, EventType};
use circle_core::{ApplicationError, EmbeddingProvider};

use crate::connection::DbPool;
use crate::repositories::event::format_timestamp;
use crate::repositories::{RepositoryError, SqlVectorStore, VectorRecord, VectorStore};

pub const SEED_RNG: u64 = 42;
pub const CATALOG_SIZE: usize = 200;
pub const ACTIVITY_WINDOW_DAYS: i64 = 40;

pub const FRIENDS: &[&str] = &[
    "Ava Patel",
    "Liam Ortega",
    "Maya Chen",
    "Sofia Rossi",
    "Jordan Blake",
    "Noah Park",
    "Amelia Brooks",
    "Ethan Rivera",
    "Harper Lee",
    "Lucas Kim",
    "Isla Morgan",
    "Mateo Silva",
    "Aria Bennett",
    "Henry Walker",
    "Zoe Foster",
    "Oliver Quinn",
    "Ella Hughes",
    "Leo Singh",
    "Camila Torres",
    "Caleb Nguyen",
];

struct CatalogEntry {
    title: String,
    brand: String,
    category: String,
    price: Decimal,
    description: String,
}

/// (title, brand, category, price in cents, description)
const CORE_PRODUCTS: &[(&str, &str, &str, i64, &str)] = &[
    (
        "Eden Skin Serum",
        "Velvet Labs",
        "Beauty",
        6200,
        "Hydrating serum with peptides, niacinamide, and ceramides for a luminous glow.",
    ),
    (
        "Lumen Smart Desk Lamp",
        "Lumen",
        "Home",
        8900,
        "Adaptive desk lamp with circadian presets, wireless charging, and matte brass finish.",
    ),
    (
        "Nimbus Noise-Canceling Headphones",
        "Aurora Audio",
        "Electronics",
        24900,
        "Immersive over-ear headphones with adaptive ANC and 36-hour battery life.",
    ),
    (
        "Atlas Carry-On",
        "Atlas Travel",
        "Travel",
        21500,
        "Expandable carry-on with silent glide wheels, hard shell, and smart packing cubes.",
    ),
];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("Beauty", &["serum", "cleanser", "mask", "body oil", "toner", "lip balm"]),
    ("Home", &["lamp", "throw", "diffuser", "desk organizer", "air purifier", "coffee maker"]),
    ("Electronics", &["headphones", "smartwatch", "speaker", "camera", "tablet", "earbuds"]),
    ("Travel", &["carry-on", "weekender", "packing cubes", "neck pillow", "travel kit"]),
    ("Fitness", &["yoga mat", "resistance set", "water bottle", "foam roller", "training shoes"]),
    ("Fashion", &["sneakers", "jacket", "tote bag", "denim", "sweater", "scarf"]),
];

const TITLE_PREFIXES: &[&str] = &["Aura", "Pulse", "Nova", "Echo", "Glow", "Summit"];

const BRANDS: &[&str] = &[
    "Luna & Co",
    "Brightline",
    "Everlane Studio",
    "Verve",
    "Northwind",
    "Solace",
    "Citrine",
    "Aster",
    "Marina",
    "Studio 8",
    "Viva",
    "Oasis",
];

const PHRASES: &[&str] = &[
    "Designed for modern routines with premium materials and thoughtful details.",
    "Soft-touch finish and lightweight profile keep it easy to use every day.",
    "Built to feel luxurious with clean lines and a calming aesthetic.",
    "Pairs effortless style with practical functionality for daily life.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub seeded: bool,
    pub friends: i64,
    pub products: i64,
    pub events: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub struct DemoDataset;

impl DemoDataset {
    /// Populate an empty database. Returns without writing when friends already exist.
    pub async fn load(pool: &DbPool, now: DateTime<Utc>) -> Result<SeedResult, RepositoryError> {
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM friends").fetch_one(pool).await?;
        if existing > 0 {
            info!(event_name = "seed.skipped", friends = existing, "seed data already present");
            return Self::counts(pool, false).await;
        }

        let mut rng = StdRng::seed_from_u64(SEED_RNG);
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO users (name) VALUES ('You')").execute(&mut *tx).await?;

        let mut friend_ids = Vec::with_capacity(FRIENDS.len());
        for (idx, name) in FRIENDS.iter().enumerate() {
            let strength = (rng.gen_range(0.45..=0.98_f64) * 100.0).round() / 100.0;
            let result =
                sqlx::query("INSERT INTO friends (name, avatar_url, strength) VALUES (?1, ?2, ?3)")
                    .bind(*name)
                    .bind(format!("https://i.pravatar.cc/100?img={}", idx + 1))
                    .bind(strength)
                    .execute(&mut *tx)
                    .await?;
            friend_ids.push(result.last_insert_rowid());
        }

        let mut product_ids = Vec::with_capacity(CATALOG_SIZE);
        for product in catalog(&mut rng) {
            let result = sqlx::query(
                "INSERT INTO products (title, brand, category, price, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&product.title)
            .bind(&product.brand)
            .bind(&product.category)
            .bind(format!("{:.2}", product.price))
            .bind(&product.description)
            .execute(&mut *tx)
            .await?;
            product_ids.push(result.last_insert_rowid());
        }

        for &friend_id in &friend_ids {
            let purchases = rng.gen_range(10..=25);
            let views = rng.gen_range(15..=40);
            let activity = [(EventType::Purchase, purchases), (EventType::View, views)];
            for (event_type, amount) in activity {
                let picked: Vec<i64> =
                    product_ids.choose_multiple(&mut rng, amount).copied().collect();
                for product_id in picked {
                    let at = now - Duration::days(rng.gen_range(0..=ACTIVITY_WINDOW_DAYS));
                    sqlx::query(
                        "INSERT INTO friend_events (friend_id, product_id, event_type, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .bind(friend_id)
                    .bind(product_id)
                    .bind(event_type.as_str())
                    .bind(format_timestamp(at))
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;

        let result = Self::counts(pool, true).await?;
        info!(
            event_name = "seed.completed",
            friends = result.friends,
            products = result.products,
            events = result.events,
            "demo dataset seeded"
        );
        Ok(result)
    }

    /// Check the seeded shape: counts and value ranges.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let counts = Self::counts(pool, false).await?;
        let min_events = FRIENDS.len() as i64 * (10 + 15);
        let max_events = FRIENDS.len() as i64 * (25 + 40);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(pool).await?;
        let strengths_in_range: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM friends WHERE strength BETWEEN 0.45 AND 0.98",
        )
        .fetch_one(pool)
        .await?;
        let core_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE title IN
             ('Eden Skin Serum', 'Lumen Smart Desk Lamp', 'Nimbus Noise-Canceling Headphones', 'Atlas Carry-On')",
        )
        .fetch_one(pool)
        .await?;

        let checks = vec![
            ("users", users == 1),
            ("friends", counts.friends == FRIENDS.len() as i64),
            ("friend-strength-range", strengths_in_range == counts.friends),
            ("products", counts.products == CATALOG_SIZE as i64),
            ("core-products", core_products == CORE_PRODUCTS.len() as i64),
            ("friend-events", (min_events..=max_events).contains(&counts.events)),
        ];
        let all_present = checks.iter().all(|(_, ok)| *ok);

        Ok(VerificationResult { all_present, checks })
    }

    /// Remove all demo data, vectors included.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for table in ["event_vectors", "friend_events", "products", "friends", "users"] {
            sqlx::query(&format!("DELETE FROM {table}")).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn counts(pool: &DbPool, seeded: bool) -> Result<SeedResult, RepositoryError> {
        let friends: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM friends").fetch_one(pool).await?;
        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(pool).await?;
        let events: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM friend_events").fetch_one(pool).await?;
        Ok(SeedResult { seeded, friends, products, events })
    }
}

fn catalog(rng: &mut StdRng) -> Vec<CatalogEntry> {
    let mut products: Vec<CatalogEntry> = CORE_PRODUCTS
        .iter()
        .map(|(title, brand, category, cents, description)| CatalogEntry {
            title: (*title).to_owned(),
            brand: (*brand).to_owned(),
            category: (*category).to_owned(),
            price: Decimal::new(*cents, 2),
            description: (*description).to_owned(),
        })
        .collect();

    while products.len() < CATALOG_SIZE {
        let (category, items) = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        let item = items[rng.gen_range(0..items.len())];
        let prefix = TITLE_PREFIXES[rng.gen_range(0..TITLE_PREFIXES.len())];
        let brand = BRANDS[rng.gen_range(0..BRANDS.len())];
        let cents = rng.gen_range(2800..=32000);
        let phrase = PHRASES[rng.gen_range(0..PHRASES.len())];

        products.push(CatalogEntry {
            title: format!("{prefix} {}", title_case(item)),
            brand: brand.to_owned(),
            category: category.to_owned(),
            price: Decimal::new(cents, 2),
            description: format!(
                "A {item} tailored for {} lovers. {phrase}",
                category.to_lowercase()
            ),
        });
    }

    products
}

/// Upper-case the first letter of every alphabetic run: `carry-on` -> `Carry-On`.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[derive(Debug, thiserror::Error)]
pub enum VectorRebuildError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("embedding failed: {0}")]
    Embedding(#[from] ApplicationError),
}

/// Re-embed every event's `"{title} {description}"` document and replace the vector store.
pub async fn rebuild_vectors(
    pool: &DbPool,
    embedder: &dyn EmbeddingProvider,
) -> Result<usize, VectorRebuildError> {
    let rows: Vec<(i64, String, String)> = sqlx::query_as(
        "SELECT friend_events.id, products.title, products.description
         FROM friend_events
         JOIN products ON products.id = friend_events.product_id
         ORDER BY friend_events.id ASC",
    )
    .fetch_all(pool)
    .await
    .map_err(RepositoryError::from)?;

    if rows.is_empty() {
        return Ok(0);
    }

    let documents: Vec<String> =
        rows.iter().map(|(_, title, description)| format!("{title} {description}")).collect();
    let embeddings = embedder.embed_documents(&documents).await?;
    if embeddings.len() != documents.len() {
        return Err(VectorRebuildError::Embedding(ApplicationError::Integration(format!(
            "expected {} embeddings, got {}",
            documents.len(),
            embeddings.len()
        ))));
    }

    let records: Vec<VectorRecord> = rows
        .into_iter()
        .zip(documents)
        .zip(embeddings)
        .map(|(((event_id, _, _), document), embedding)| VectorRecord {
            event_id: EventId(event_id),
            embedding,
            document,
        })
        .collect();
    let total = records.len();

    let store = SqlVectorStore::new(pool.clone());
    store.clear().await?;
    store.upsert_many(records).await?;

    info!(
        event_name = "vectors.rebuilt",
        events = total,
        provider = embedder.name(),
        "vector store rebuilt"
    );
    Ok(total)
}

/// Seed an empty database and build its vectors.
pub async fn ensure_seeded(
    pool: &DbPool,
    embedder: &dyn EmbeddingProvider,
) -> Result<SeedResult, VectorRebuildError> {
    let result = DemoDataset::load(pool, Utc::now()).await?;
    if result.seeded {
        rebuild_vectors(pool, embedder).await?;
    }
    Ok(result)
}

/// Rebuild vectors when the store is empty. Returns whether a rebuild happened.
pub async fn ensure_vectors_ready(
    pool: &DbPool,
    embedder: &dyn EmbeddingProvider,
) -> Result<bool, VectorRebuildError> {
    let store = SqlVectorStore::new(pool.clone());
    if store.count().await? > 0 {
        return Ok(false);
    }

    info!(event_name = "vectors.empty", "vector store is empty, rebuilding");
    rebuild_vectors(pool, embedder).await?;
    Ok(true)
}
