use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Row};
use thiserror::Error;
use tokio_rusqlite::Connection;
use tracing::info;

use super::schema::SCHEMA;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),
    #[error("corrupt timestamp in column {column}: {reason}")]
    CorruptTimestamp { column: usize, reason: String },
}

impl From<tokio_rusqlite::Error> for StorageError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::FromSqlConversionFailure(
                column,
                _,
                source,
            )) if source.is::<chrono::ParseError>() => StorageError::CorruptTimestamp {
                column,
                reason: source.to_string(),
            },
            other => StorageError::Database(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// One persisted air quality observation
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub latitude: String,
    pub longitude: String,
    pub aqi: i64,
    pub risk: String,
}

#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub latitude: String,
    pub longitude: String,
    pub aqi: i64,
    pub risk: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub latitude: String,
    pub longitude: String,
    pub last_alert: Option<DateTime<Utc>>,
}

/// Outcome of a registration; a duplicate email is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(i64),
    AlreadyRegistered,
}

/// SQLite-backed store for history records and subscribers
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn open(db_path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        info!(path = %db_path.display(), "Opened database");
        Self::with_connection(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    /// Run raw SQL against the store, for setting up failure cases.
    #[cfg(test)]
    pub async fn execute_batch(&self, sql: &'static str) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // History operations

    pub async fn insert_history(&self, record: NewHistoryRecord) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO historico_aqi (timestamp, latitude, longitude, indice_aqi, risco)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        encode_timestamp(record.timestamp),
                        record.latitude,
                        record.longitude,
                        record.aqi,
                        record.risk,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    /// All history records, newest first.
    pub async fn list_history(&self) -> Result<Vec<HistoryRecord>> {
        let records = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, latitude, longitude, indice_aqi, risco
                     FROM historico_aqi ORDER BY timestamp DESC, id DESC",
                )?;
                let records = stmt
                    .query_map([], history_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    pub async fn count_history(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM historico_aqi", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await?;
        Ok(count)
    }

    /// Indices recorded at exactly this coordinate since `since` (inclusive), oldest first.
    pub async fn history_indices_since(
        &self,
        latitude: &str,
        longitude: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let indices = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT indice_aqi FROM historico_aqi
                     WHERE latitude = ?1 AND longitude = ?2 AND timestamp >= ?3
                     ORDER BY timestamp ASC, id ASC",
                )?;
                let indices = stmt
                    .query_map(
                        params![latitude, longitude, encode_timestamp(since)],
                        |row| row.get(0),
                    )?
                    .collect::<std::result::Result<Vec<i64>, _>>()?;
                Ok(indices)
            })
            .await?;
        Ok(indices)
    }

    // Subscriber operations

    pub async fn register_subscriber(
        &self,
        email: &str,
        latitude: &str,
        longitude: &str,
    ) -> Result<Registration> {
        let email = email.to_string();
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let registration = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO inscritos (email, latitude, longitude) VALUES (?1, ?2, ?3)
                     ON CONFLICT(email) DO NOTHING",
                    params![email, latitude, longitude],
                )?;
                if changed == 0 {
                    Ok(Registration::AlreadyRegistered)
                } else {
                    Ok(Registration::Created(conn.last_insert_rowid()))
                }
            })
            .await?;
        Ok(registration)
    }

    /// Subscribers whose stored coordinate is string-equal to the given one.
    pub async fn subscribers_at(&self, latitude: &str, longitude: &str) -> Result<Vec<Subscriber>> {
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let subscribers = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, email, latitude, longitude, ultimo_alerta
                     FROM inscritos WHERE latitude = ?1 AND longitude = ?2 ORDER BY id",
                )?;
                let subscribers = stmt
                    .query_map(params![latitude, longitude], subscriber_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscribers)
            })
            .await?;
        Ok(subscribers)
    }

    #[cfg(test)]
    pub async fn subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        use rusqlite::OptionalExtension;

        let email = email.to_string();
        let subscriber = self
            .conn
            .call(move |conn| {
                let subscriber = conn
                    .query_row(
                        "SELECT id, email, latitude, longitude, ultimo_alerta
                         FROM inscritos WHERE email = ?1",
                        params![email],
                        subscriber_from_row,
                    )
                    .optional()?;
                Ok(subscriber)
            })
            .await?;
        Ok(subscriber)
    }

    #[cfg(test)]
    pub async fn count_subscribers(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM inscritos", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await?;
        Ok(count)
    }

    /// Stamp the subscriber's last alert; commits on its own.
    pub async fn record_alert(&self, subscriber_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "UPDATE inscritos SET ultimo_alerta = ?1 WHERE id = ?2",
                    params![encode_timestamp(at), subscriber_id],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn history_from_row(row: &Row) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: row.get(0)?,
        timestamp: decode_timestamp(row, 1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        aqi: row.get(4)?,
        risk: row.get(5)?,
    })
}

fn subscriber_from_row(row: &Row) -> rusqlite::Result<Subscriber> {
    let last_alert = match row.get::<_, Option<String>>(4)? {
        Some(_) => Some(decode_timestamp(row, 4)?),
        None => None,
    };
    Ok(Subscriber {
        id: row.get(0)?,
        email: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        last_alert,
    })
}
