mod import;
mod sample;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use duty_core::{HtsNumber, TariffRecord};
use parking_lot::RwLock;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

pub use import::{read_tariff_csv, read_tariff_csv_path, CsvImport};
pub use sample::sample_records;

/// Read side used by the calculator plus the write side used for loading.
pub trait TariffRepository: Send + Sync {
    /// Exact digit match first, otherwise the lowest number starting with
    /// the query digits.
    async fn get_rate_record(&self, hts: &HtsNumber) -> Result<Option<TariffRecord>>;
    async fn search_by_description(&self, text: &str, limit: usize)
        -> Result<Vec<TariffRecord>>;
    async fn list_hts_numbers(&self) -> Result<Vec<String>>;
    async fn upsert_record(&self, record: TariffRecord) -> Result<()>;
    async fn insert_records(&self, records: Vec<TariffRecord>) -> Result<usize>;
}

fn record_key(record: &TariffRecord) -> Result<HtsNumber> {
    HtsNumber::parse(&record.hts_number)
        .with_context(|| format!("invalid HTS number {:?}", record.hts_number))
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<String, TariffRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TariffRepository for MemoryStore {
    async fn get_rate_record(&self, hts: &HtsNumber) -> Result<Option<TariffRecord>> {
        let digits = hts.digits();
        let records = self.records.read();
        let found = records
            .range(digits.to_string()..)
            .next()
            .filter(|(key, _)| key.starts_with(digits))
            .map(|(_, record)| record.clone());
        Ok(found)
    }

    async fn search_by_description(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<TariffRecord>> {
        // ASCII-only folding, the same as SQLite's LIKE.
        let needle = text.to_ascii_lowercase();
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| record.description.to_ascii_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_hts_numbers(&self) -> Result<Vec<String>> {
        Ok(self
            .records
            .read()
            .values()
            .map(|record| record.hts_number.clone())
            .collect())
    }

    async fn upsert_record(&self, record: TariffRecord) -> Result<()> {
        let key = record_key(&record)?;
        self.records.write().insert(key.digits().to_string(), record);
        Ok(())
    }

    async fn insert_records(&self, records: Vec<TariffRecord>) -> Result<usize> {
        let keyed = records
            .into_iter()
            .map(|record| Ok((record_key(&record)?.digits().to_string(), record)))
            .collect::<Result<Vec<_>>>()?;

        let count = keyed.len();
        self.records.write().extend(keyed);
        Ok(count)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url {}", database_url))?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hts_tariffs (
              hts_digits TEXT PRIMARY KEY,
              hts_number TEXT NOT NULL,
              description TEXT NOT NULL,
              general_rate TEXT,
              special_rate TEXT,
              column2_rate TEXT,
              section TEXT,
              chapter TEXT,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("hts_tariffs schema ready");
        Ok(())
    }
}

const UPSERT_TARIFF: &str = r#"
    INSERT INTO hts_tariffs (
      hts_digits, hts_number, description, general_rate, special_rate,
      column2_rate, section, chapter, created_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(hts_digits) DO UPDATE SET
      hts_number=excluded.hts_number,
      description=excluded.description,
      general_rate=excluded.general_rate,
      special_rate=excluded.special_rate,
      column2_rate=excluded.column2_rate,
      section=excluded.section,
      chapter=excluded.chapter
"#;

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> TariffRecord {
    TariffRecord {
        hts_number: row.get("hts_number"),
        description: row.get("description"),
        general_rate: row.get("general_rate"),
        special_rate: row.get("special_rate"),
        column2_rate: row.get("column2_rate"),
        section: row.get("section"),
        chapter: row.get("chapter"),
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl TariffRepository for SqliteStore {
    async fn get_rate_record(&self, hts: &HtsNumber) -> Result<Option<TariffRecord>> {
        let row = sqlx::query(
            r#"
            SELECT hts_number, description, general_rate, special_rate,
                   column2_rate, section, chapter
            FROM hts_tariffs
            WHERE hts_digits = ?1 OR hts_digits LIKE ?2
            ORDER BY hts_digits = ?1 DESC, hts_digits
            LIMIT 1
            "#,
        )
        .bind(hts.digits())
        .bind(format!("{}%", hts.digits()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn search_by_description(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<TariffRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT hts_number, description, general_rate, special_rate,
                   column2_rate, section, chapter
            FROM hts_tariffs
            WHERE description LIKE ?1 ESCAPE '\'
            ORDER BY hts_digits
            LIMIT ?2
            "#,
        )
        .bind(format!("%{}%", escape_like(text)))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn list_hts_numbers(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT hts_number FROM hts_tariffs ORDER BY hts_digits")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("hts_number")).collect())
    }

    async fn upsert_record(&self, record: TariffRecord) -> Result<()> {
        let key = record_key(&record)?;

        sqlx::query(UPSERT_TARIFF)
            .bind(key.digits())
            .bind(&record.hts_number)
            .bind(&record.description)
            .bind(&record.general_rate)
            .bind(&record.special_rate)
            .bind(&record.column2_rate)
            .bind(&record.section)
            .bind(&record.chapter)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_records(&self, records: Vec<TariffRecord>) -> Result<usize> {
        let created_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for record in &records {
            let key = record_key(record)?;
            sqlx::query(UPSERT_TARIFF)
                .bind(key.digits())
                .bind(&record.hts_number)
                .bind(&record.description)
                .bind(&record.general_rate)
                .bind(&record.special_rate)
                .bind(&record.column2_rate)
                .bind(&record.section)
                .bind(&record.chapter)
                .bind(&created_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(count = records.len(), "inserted HTS records");
        Ok(records.len())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }
}

impl TariffRepository for Store {
    async fn get_rate_record(&self, hts: &HtsNumber) -> Result<Option<TariffRecord>> {
        match self {
            Store::Memory(store) => store.get_rate_record(hts).await,
            Store::Sqlite(store) => store.get_rate_record(hts).await,
        }
    }

    async fn search_by_description(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<TariffRecord>> {
        match self {
            Store::Memory(store) => store.search_by_description(text, limit).await,
            Store::Sqlite(store) => store.search_by_description(text, limit).await,
        }
    }

    async fn list_hts_numbers(&self) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.list_hts_numbers().await,
            Store::Sqlite(store) => store.list_hts_numbers().await,
        }
    }

    async fn upsert_record(&self, record: TariffRecord) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_record(record).await,
            Store::Sqlite(store) => store.upsert_record(record).await,
        }
    }

    async fn insert_records(&self, records: Vec<TariffRecord>) -> Result<usize> {
        match self {
            Store::Memory(store) => store.insert_records(records).await,
            Store::Sqlite(store) => store.insert_records(records).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hts(raw: &str) -> HtsNumber {
        HtsNumber::parse(raw).unwrap()
    }

    async fn exercise_lookup(store: &impl TariffRepository) {
        store.insert_records(sample_records()).await.unwrap();

        let exact = store.get_rate_record(&hts("0101300000")).await.unwrap().unwrap();
        assert_eq!(exact.description, "Asses");

        let dotted = store.get_rate_record(&hts("0201.10.05.00")).await.unwrap().unwrap();
        assert_eq!(dotted.general_rate.as_deref(), Some("4.4¢/kg"));

        let prefix = store.get_rate_record(&hts("0102")).await.unwrap().unwrap();
        assert_eq!(prefix.hts_number, "0102.21.00.00");

        assert!(store.get_rate_record(&hts("8471.30")).await.unwrap().is_none());

        let hits = store.search_by_description("CATTLE", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(store.search_by_description("e", 2).await.unwrap().len(), 2);

        let numbers = store.list_hts_numbers().await.unwrap();
        assert_eq!(numbers.first().map(String::as_str), Some("0101.30.00.00"));
        assert_eq!(numbers.len(), 4);
    }

    #[tokio::test]
    async fn memory_store_lookup() {
        exercise_lookup(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn sqlite_store_lookup() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        exercise_lookup(&store).await;
    }

    #[tokio::test]
    async fn upsert_replaces_by_normalized_number() {
        let store = Store::sqlite("sqlite::memory:").await.unwrap();
        store
            .upsert_record(TariffRecord::new("0101.30.00.00", "Asses").with_general("6.8%"))
            .await
            .unwrap();
        store
            .upsert_record(TariffRecord::new("0101300000", "Asses, live").with_general("7%"))
            .await
            .unwrap();

        let record = store.get_rate_record(&hts("0101.30")).await.unwrap().unwrap();
        assert_eq!(record.description, "Asses, live");
        assert_eq!(store.list_hts_numbers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_record_numbers_are_rejected() {
        let store = MemoryStore::new();
        let err = store
            .upsert_record(TariffRecord::new("not a code", "Bad"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid HTS number"));
    }

    async fn non_ascii_search_hits(store: &impl TariffRepository) -> Vec<usize> {
        store
            .upsert_record(TariffRecord::new("7318.16.00", "Écrous en acier"))
            .await
            .unwrap();

        let mut hits = Vec::new();
        for query in ["ÉCROUS EN ACIER", "écrous", "Écrous"] {
            hits.push(store.search_by_description(query, 10).await.unwrap().len());
        }
        hits
    }

    #[tokio::test]
    async fn stores_fold_case_alike_for_non_ascii_text() {
        let memory = non_ascii_search_hits(&MemoryStore::new()).await;
        let sqlite =
            non_ascii_search_hits(&SqliteStore::connect("sqlite::memory:").await.unwrap()).await;

        assert_eq!(memory, vec![1, 0, 1]);
        assert_eq!(memory, sqlite);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.insert_records(sample_records()).await.unwrap();
        assert!(store.search_by_description("%", 10).await.unwrap().is_empty());
    }
}
