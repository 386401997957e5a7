use chrono::{DateTime, Utc};
use postgres::{NoTls, Row};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use tickstore_domain::repositories::tick_store::{StoreError, TickStore};
use tickstore_domain::services::tick_queries;
use tickstore_domain::value_objects::price_stats::{NearestTick, RangeExtremes, SymbolSummary};
use tickstore_domain::value_objects::tick::{StoredTick, Tick};

type PgPool = Pool<PostgresConnectionManager<NoTls>>;
type PgConnection = PooledConnection<PostgresConnectionManager<NoTls>>;

const TICK_COLUMNS: &str = "id, symbol, price, event_time, ingestion_time";

/// Pooled PostgreSQL tick store. One connection pool serves both the ingestion writes and
/// the query reads.
#[derive(Debug, Clone)]
pub struct PostgresTickStore {
    pool: PgPool,
    table: String,
}

impl PostgresTickStore {
    /// Builds the pool eagerly, so an unreachable database fails here.
    pub fn new(
        db_url: &str,
        table: String,
        pool_max_size: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        validate_table_name(&table)
            .map_err(|err| StoreError::InvalidConfig(format!("invalid table '{table}': {err}")))?;

        let manager = build_manager(db_url)?;
        let pool = Pool::builder()
            .max_size(pool_max_size.max(1))
            .connection_timeout(connect_timeout)
            .build(manager)
            .map_err(|err| StoreError::Unavailable(format!("failed to build postgres pool: {err}")))?;

        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn checkout(&self, op: &'static str) -> Result<PgConnection, String> {
        let get_start = Instant::now();
        match self.pool.get() {
            Ok(client) => {
                metrics::histogram!("tickstore.infra.postgres.pool.get_ms")
                    .record(get_start.elapsed().as_secs_f64() * 1000.0);
                Ok(client)
            }
            Err(err) => {
                metrics::counter!("tickstore.infra.postgres.pool.get.errors_total", "op" => op)
                    .increment(1);
                tracing::error!(op, error = %err, "failed to checkout postgres connection");
                Err(format!("failed to checkout postgres connection: {err}"))
            }
        }
    }

    fn read<T>(
        &self,
        op: &'static str,
        query: impl FnOnce(&mut PgConnection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let start = Instant::now();
        let mut client = self.checkout(op).map_err(StoreError::Unavailable)?;
        let result = query(&mut client);
        let outcome = if result.is_ok() { "ok" } else { "err" };
        metrics::counter!("tickstore.infra.postgres.read.calls_total", "op" => op, "result" => outcome)
            .increment(1);
        metrics::histogram!("tickstore.infra.postgres.read_ms", "op" => op)
            .record(start.elapsed().as_secs_f64() * 1000.0);
        if let Err(err) = &result {
            tracing::warn!(op, table = %self.table, error = %err, "postgres read failed");
        }
        result
    }
}

impl TickStore for PostgresTickStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let _span = tracing::info_span!("infra.postgres.ensure_schema", table = %self.table).entered();
        let mut client = self.checkout("ensure_schema").map_err(StoreError::Unavailable)?;
        client
            .batch_execute(&schema_sql(&self.table))
            .map_err(|err| StoreError::Schema(format!("failed to create {}: {err}", self.table)))?;
        tracing::info!("tick schema ready");
        Ok(())
    }

    fn write(&self, tick: &Tick) -> Result<StoredTick, StoreError> {
        let start = Instant::now();
        let result = self.insert(tick);
        let outcome = if result.is_ok() { "ok" } else { "err" };
        metrics::counter!("tickstore.infra.postgres.write.calls_total", "result" => outcome)
            .increment(1);
        metrics::histogram!("tickstore.infra.postgres.write_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    fn latest(&self, symbol: &str) -> Result<Option<StoredTick>, StoreError> {
        let sql = format!(
            "SELECT {TICK_COLUMNS} FROM {} WHERE symbol = $1 \
             ORDER BY event_time DESC, ingestion_time DESC, id DESC LIMIT 1",
            self.table
        );
        self.read("latest", |client| {
            let rows = client
                .query(&sql, &[&symbol])
                .map_err(|err| StoreError::Query(format!("latest tick query failed: {err}")))?;
            rows.first().map(stored_tick_from_row).transpose()
        })
    }

    fn nearest(
        &self,
        symbol: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<NearestTick>, StoreError> {
        // Closest at-or-before and closest after; both walk the (symbol, event_time) index.
        let sql = format!(
            "(SELECT {TICK_COLUMNS} FROM {table} WHERE symbol = $1 AND event_time <= $2 \
               ORDER BY event_time DESC, ingestion_time ASC, id ASC LIMIT 1) \
             UNION ALL \
             (SELECT {TICK_COLUMNS} FROM {table} WHERE symbol = $1 AND event_time > $2 \
               ORDER BY event_time ASC, ingestion_time ASC, id ASC LIMIT 1)",
            table = self.table
        );
        self.read("nearest", |client| {
            let rows = client
                .query(&sql, &[&symbol, &target])
                .map_err(|err| StoreError::Query(format!("nearest tick query failed: {err}")))?;
            let candidates = rows
                .iter()
                .map(stored_tick_from_row)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tick_queries::pick_nearest(&candidates, target))
        })
    }

    fn range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<RangeExtremes>, StoreError> {
        let sql = format!(
            "SELECT MIN(price), MAX(price), COUNT(*), MIN(event_time), MAX(event_time) FROM {} \
             WHERE symbol = $1 AND event_time >= $2 AND event_time < $3",
            self.table
        );
        self.read("range", |client| {
            let row = client
                .query_one(&sql, &[&symbol, &start, &end])
                .map_err(|err| StoreError::Query(format!("range query failed: {err}")))?;
            let count: i64 = column(&row, 2)?;
            if count == 0 {
                return Ok(None);
            }
            Ok(Some(RangeExtremes {
                symbol: symbol.to_string(),
                start,
                end,
                min_price: column(&row, 0)?,
                max_price: column(&row, 1)?,
                count: count as u64,
                first_event_time: column(&row, 3)?,
                last_event_time: column(&row, 4)?,
            }))
        })
    }

    fn summary(&self) -> Result<Vec<SymbolSummary>, StoreError> {
        let sql = format!(
            "SELECT symbol, COUNT(*), MIN(price), MAX(price), ROUND(AVG(price), {scale}), \
                    MIN(event_time), MAX(event_time) \
             FROM {table} GROUP BY symbol ORDER BY symbol ASC",
            scale = tick_queries::AVERAGE_SCALE,
            table = self.table
        );
        self.read("summary", |client| {
            let rows = client
                .query(&sql, &[])
                .map_err(|err| StoreError::Query(format!("summary query failed: {err}")))?;
            rows.iter()
                .map(|row| -> Result<SymbolSummary, StoreError> {
                    let count: i64 = column(row, 1)?;
                    Ok(SymbolSummary {
                        symbol: column(row, 0)?,
                        count: count as u64,
                        min_price: column(row, 2)?,
                        max_price: column(row, 3)?,
                        avg_price: column(row, 4)?,
                        first_event_time: column(row, 5)?,
                        last_event_time: column(row, 6)?,
                    })
                })
                .collect()
        })
    }
}

impl PostgresTickStore {
    fn insert(&self, tick: &Tick) -> Result<StoredTick, StoreError> {
        let _span = tracing::debug_span!(
            "infra.postgres.write_tick",
            table = %self.table,
            symbol = %tick.symbol()
        )
        .entered();

        let mut client = self.checkout("write").map_err(StoreError::WriteFailed)?;
        let sql = format!(
            "INSERT INTO {} (event_time, symbol, price) VALUES ($1, $2, $3) \
             RETURNING id, symbol, price, event_time, ingestion_time",
            self.table
        );
        let event_time = tick.event_time();
        let symbol = tick.symbol();
        let price = tick.price();
        let row = client
            .query_one(&sql, &[&event_time, &symbol, &price])
            .map_err(|err| StoreError::WriteFailed(format!("insert failed: {err}")))?;

        // Built from the row so the result matches what the column actually holds.
        stored_tick_from_row(&row)
            .map_err(|err| StoreError::WriteFailed(format!("insert returned a bad row: {err}")))
    }
}

fn build_manager(db_url: &str) -> Result<PostgresConnectionManager<NoTls>, StoreError> {
    let config = db_url
        .parse::<postgres::Config>()
        .map_err(|err| StoreError::InvalidConfig(format!("invalid postgres db url: {err}")))?;
    Ok(PostgresConnectionManager::new(config, NoTls))
}

fn column<'a, T>(row: &'a Row, idx: usize) -> Result<T, StoreError>
where
    T: postgres::types::FromSql<'a>,
{
    row.try_get(idx)
        .map_err(|err| StoreError::Query(format!("unexpected column {idx}: {err}")))
}

fn stored_tick_from_row(row: &Row) -> Result<StoredTick, StoreError> {
    let id: i64 = column(row, 0)?;
    let symbol: String = column(row, 1)?;
    let price: Decimal = column(row, 2)?;
    let event_time: DateTime<Utc> = column(row, 3)?;
    let tick = Tick::new(&symbol, price, event_time)
        .map_err(|err| StoreError::Query(format!("stored tick id={id} is invalid: {err}")))?;
    Ok(StoredTick {
        id,
        tick,
        ingestion_time: column(row, 4)?,
    })
}

/// Idempotent DDL for `table` (optionally schema-qualified).
pub fn schema_sql(table: &str) -> String {
    let bare = table.rsplit('.').next().unwrap_or(table);
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n\
         \x20   id BIGSERIAL PRIMARY KEY,\n\
         \x20   event_time TIMESTAMPTZ NOT NULL,\n\
         \x20   symbol VARCHAR(20) NOT NULL,\n\
         \x20   price NUMERIC(20, 8) NOT NULL CHECK (price > 0),\n\
         \x20   ingestion_time TIMESTAMPTZ NOT NULL DEFAULT NOW()\n\
         );\n\
         CREATE INDEX IF NOT EXISTS idx_{bare}_symbol_event_time ON {table} (symbol, event_time);\n"
    )
}

pub fn validate_table_name(table: &str) -> Result<(), String> {
    if table.is_empty() {
        return Err("table name is empty".to_string());
    }
    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 {
        return Err(format!("invalid table name: {table}"));
    }
    for part in parts {
        let mut chars = part.chars();
        let first = match chars.next() {
            Some(ch) => ch,
            None => return Err(format!("invalid table name: {table}")),
        };
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(format!("invalid table name: {table}"));
        }
        if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(format!("invalid table name: {table}"));
        }
    }
    Ok(())
}
