//! Access to the SONiC Redis databases.
//!
//! SONiC keeps its state in several logical Redis databases on one server.
//! Collectors only need two read operations, so they talk to a [`SonicDb`]
//! rather than to Redis directly; [`RedisDb`] is the production backend and
//! [`MemoryDb`] backs the tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, ConnectionInfo, IntoConnectionInfo};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{DbError, SwitchError};

/// Hash fields of one Redis key, ordered by field name.
pub type Fields = BTreeMap<String, String>;

/// Logical SONiC databases read by the collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Database {
    /// APPL_DB: application state pushed by the control plane.
    Appl,
    /// COUNTERS_DB: SAI statistics polled from the ASIC.
    Counters,
    /// STATE_DB: platform and feature state.
    State,
}

impl Database {
    /// Redis database index.
    pub fn index(&self) -> i64 {
        match self {
            Database::Appl => 0,
            Database::Counters => 2,
            Database::State => 6,
        }
    }

    /// SONiC name of the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Database::Appl => "APPL_DB",
            Database::Counters => "COUNTERS_DB",
            Database::State => "STATE_DB",
        }
    }
}

impl std::fmt::Display for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to the SONiC databases.
#[async_trait]
pub trait SonicDb: Send + Sync {
    /// All fields of a hash. A missing key yields an empty map.
    async fn hgetall(&self, db: Database, key: &str) -> Result<Fields, DbError>;

    /// Keys matching a Redis glob pattern.
    async fn keys(&self, db: Database, pattern: &str) -> Result<Vec<String>, DbError>;
}

/// [`SonicDb`] backed by a Redis server.
///
/// One multiplexed connection is opened lazily per database and dropped
/// after any error, so the next read reconnects.
pub struct RedisDb {
    info: ConnectionInfo,
    timeout: Duration,
    connections: Mutex<HashMap<Database, MultiplexedConnection>>,
}

impl RedisDb {
    /// Parse the server URL. No connection is made until the first read.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, SwitchError> {
        let info = url
            .into_connection_info()
            .map_err(|source| SwitchError::InvalidUrl {
                url: url.to_string(),
                source,
            })?;

        Ok(Self {
            info,
            timeout,
            connections: Mutex::new(HashMap::new()),
        })
    }

    async fn connection(&self, db: Database) -> Result<MultiplexedConnection, DbError> {
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get(&db) {
            return Ok(conn.clone());
        }

        let mut info = self.info.clone();
        info.redis.db = db.index();
        let conn = Client::open(info)?
            .get_multiplexed_async_connection()
            .await?;

        debug!(db = %db, "Connected to SONiC database");
        connections.insert(db, conn.clone());
        Ok(conn)
    }

    async fn forget(&self, db: Database) {
        self.connections.lock().await.remove(&db);
    }

    async fn bounded<T, F>(&self, db: Database, op: F) -> Result<T, DbError>
    where
        F: std::future::Future<Output = Result<T, DbError>>,
    {
        let result = match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout(self.timeout)),
        };
        if let Err(e) = &result {
            warn!(db = %db, error = %e, "SONiC database read failed");
            self.forget(db).await;
        }
        result
    }
}

#[async_trait]
impl SonicDb for RedisDb {
    async fn hgetall(&self, db: Database, key: &str) -> Result<Fields, DbError> {
        self.bounded(db, async {
            let mut conn = self.connection(db).await?;
            let fields: Fields = conn.hgetall(key).await?;
            Ok(fields)
        })
        .await
    }

    async fn keys(&self, db: Database, pattern: &str) -> Result<Vec<String>, DbError> {
        self.bounded(db, async {
            let mut conn = self.connection(db).await?;
            let keys: Vec<String> = conn.keys(pattern).await?;
            Ok(keys)
        })
        .await
    }
}

/// In-memory [`SonicDb`] for tests and dry runs.
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<HashMap<Database, BTreeMap<String, Fields>>>,
    unavailable: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a hash, replacing any previous content.
    pub fn set<I, K, V>(&self, db: Database, key: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.tables
            .write()
            .entry(db)
            .or_default()
            .insert(key.into(), fields);
    }

    /// Remove a hash.
    pub fn remove(&self, db: Database, key: &str) {
        if let Some(table) = self.tables.write().get_mut(&db) {
            table.remove(key);
        }
    }

    /// Make every read fail, as if the server went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DbError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SonicDb for MemoryDb {
    async fn hgetall(&self, db: Database, key: &str) -> Result<Fields, DbError> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .get(&db)
            .and_then(|table| table.get(key))
            .cloned()
            .unwrap_or_default())
    }

    async fn keys(&self, db: Database, pattern: &str) -> Result<Vec<String>, DbError> {
        self.check()?;
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| DbError::Unavailable(format!("bad pattern '{}': {}", pattern, e)))?;
        Ok(self
            .tables
            .read()
            .get(&db)
            .map(|table| {
                table
                    .keys()
                    .filter(|key| pattern.matches(key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
