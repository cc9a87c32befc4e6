use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use url::Url;

use crate::connection::{ConnectionManager, DialState, UrlOptions};
use crate::error::{CommandError, RedmapError};
use crate::protocol::{Protocol, ProtocolTrait};
use crate::record::{Record, RecordMapping};
use crate::value::FromFieldValue;
use r2d2::{Pool, PooledConnection};

pub trait Connectable {
    fn get_urls(self) -> Vec<String>;
}

impl Connectable for String {
    fn get_urls(self) -> Vec<String> {
        return vec![self];
    }
}

impl Connectable for Vec<String> {
    fn get_urls(self) -> Vec<String> {
        return self;
    }
}

impl Connectable for &str {
    fn get_urls(self) -> Vec<String> {
        return vec![self.to_string()];
    }
}

impl Connectable for Vec<&str> {
    fn get_urls(self) -> Vec<String> {
        let mut urls = vec![];
        for url in self {
            urls.push(url.to_string());
        }
        return urls;
    }
}

/// How much longer the server will keep a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordTtl {
    /// The key does not exist.
    Missing,
    /// The key exists and carries no expiration.
    NoExpiry,
    /// The key expires after this much time.
    ExpiresIn(Duration),
}

/// One server's pool plus the dial bookkeeping needed to turn r2d2's opaque
/// checkout error back into the error that actually caused it.
#[derive(Clone)]
pub(crate) struct ServerPool {
    pool: Pool<ConnectionManager>,
    dial: DialState,
}

impl ServerPool {
    fn checkout(&self) -> Result<PooledConnection<ConnectionManager>, RedmapError> {
        match self.pool.get() {
            Ok(connection) => Ok(connection),
            Err(err) => Err(self.dial.classify(err)),
        }
    }
}

#[derive(Clone)]
pub struct Client {
    connections: Vec<ServerPool>,
    pub hash_function: fn(&str) -> u64,
}

unsafe impl Send for Client {}

fn default_hash_function(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    return hasher.finish();
}

impl Client {
    pub fn with_pool_size<C: Connectable>(target: C, size: u32) -> Result<Self, RedmapError> {
        let urls = target.get_urls();
        let mut connections = vec![];
        for url in urls {
            let parsed = Url::parse(url.as_str())?;
            UrlOptions::parse(&parsed)?;
            let timeout = parsed
                .query_pairs()
                .find(|&(ref k, ref _v)| k == "connect_timeout")
                .and_then(|(ref _k, ref v)| v.parse::<f64>().ok())
                .map(Duration::from_secs_f64);
            let builder = r2d2::Pool::builder()
                .max_size(size)
                .min_idle(Some(1))
                .test_on_check_out(false)
                .error_handler(Box::new(r2d2::NopErrorHandler));
            let builder = if let Some(timeout) = timeout {
                builder.connection_timeout(timeout)
            } else {
                builder
            };
            let manager = ConnectionManager::new(parsed);
            let dial = manager.dial_state();
            let pool = match builder.build(manager) {
                Ok(pool) => pool,
                Err(err) => return Err(dial.classify(err)),
            };
            connections.push(ServerPool { pool, dial });
        }
        Ok(Client {
            connections,
            hash_function: default_hash_function,
        })
    }

    /// Wrap a pool built by hand. Checkout failures from such a pool cannot
    /// be traced back to their dial error, so they all surface as
    /// [`RedmapError::PoolExhausted`].
    pub fn with_pool(pool: Pool<ConnectionManager>) -> Result<Self, RedmapError> {
        Ok(Client {
            connections: vec![ServerPool {
                pool,
                dial: DialState::default(),
            }],
            hash_function: default_hash_function,
        })
    }

    pub fn connect<C: Connectable>(target: C) -> Result<Self, RedmapError> {
        Self::with_pool_size(target, 1)
    }

    fn get_connection(&self, key: &str) -> ServerPool {
        let connections_count = self.connections.len();
        return self.connections[(self.hash_function)(key) as usize % connections_count].clone();
    }

    /// Set the socket read timeout for TCP connections.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// client.set_read_timeout(Some(::std::time::Duration::from_secs(3))).unwrap();
    /// ```
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), RedmapError> {
        for server in self.connections.iter() {
            let mut conn = server.checkout()?;
            match **conn {
                Protocol::Resp2(ref mut protocol) => protocol.stream().set_read_timeout(timeout)?,
                Protocol::Resp3(ref mut protocol) => protocol.stream().set_read_timeout(timeout)?,
            }
        }
        Ok(())
    }

    /// Set the socket write timeout for TCP connections.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// client.set_write_timeout(Some(::std::time::Duration::from_secs(3))).unwrap();
    /// ```
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<(), RedmapError> {
        for server in self.connections.iter() {
            let mut conn = server.checkout()?;
            match **conn {
                Protocol::Resp2(ref mut protocol) => protocol.stream().set_write_timeout(timeout)?,
                Protocol::Resp3(ref mut protocol) => protocol.stream().set_write_timeout(timeout)?,
            }
        }
        Ok(())
    }

    /// Write every field of a record under one key.
    ///
    /// Fields that already exist on the server are overwritten; fields the
    /// record does not mention are left alone.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let record = redmap::Record::new()
    ///     .field("title", "The WAN Show")
    ///     .field("membership_fee", 9.99);
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// client.set_record("podcast:1", &record).unwrap();
    /// ```
    pub fn set_record(&self, key: &str, record: &Record) -> Result<(), RedmapError> {
        if record.is_empty() {
            Err(CommandError::InvalidArguments)?
        }
        return self.get_connection(key).checkout()?.set_record(key, record);
    }

    /// Get one field of a record, decoded to `V`.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// let title: String = client.get_field("podcast:1", "title").unwrap();
    /// let fee: f64 = client.get_field("podcast:1", "membership_fee").unwrap();
    /// ```
    pub fn get_field<V: FromFieldValue>(&self, key: &str, field: &str) -> Result<V, RedmapError> {
        let raw = match self.get_connection(key).checkout()?.get_field(key, field)? {
            Some(raw) => raw,
            None => Err(CommandError::KeyNotFound)?,
        };
        return V::from_field_value(raw);
    }

    /// Get every field of a record, decoded to `V`.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// let fields: std::collections::HashMap<String, String> =
    ///     client.get_all("podcast:1").unwrap();
    /// ```
    pub fn get_all<V: FromFieldValue>(&self, key: &str) -> Result<HashMap<String, V>, RedmapError> {
        let raw = self.get_connection(key).checkout()?.get_all(key)?;
        if raw.is_empty() {
            Err(CommandError::KeyNotFound)?
        }
        let mut fields = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            fields.insert(name, V::from_field_value(value)?);
        }
        return Ok(fields);
    }

    /// Get a whole record shaped by an explicit field mapping.
    ///
    /// Every field the mapping names must be present on the server; fields
    /// the mapping does not name are ignored.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// #[derive(Default)]
    /// struct Podcast {
    ///     title: String,
    ///     membership_fee: f64,
    /// }
    ///
    /// let mapping = redmap::RecordMapping::builder()
    ///     .field("title", |podcast: &mut Podcast, title| podcast.title = title)
    ///     .field("membership_fee", |podcast: &mut Podcast, fee| podcast.membership_fee = fee)
    ///     .build()
    ///     .unwrap();
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// let podcast = client.get_record("podcast:1", &mapping).unwrap();
    /// assert_eq!(podcast.title, "The WAN Show");
    /// ```
    pub fn get_record<S: Default>(
        &self,
        key: &str,
        mapping: &RecordMapping<S>,
    ) -> Result<S, RedmapError> {
        let mut raw = self.get_connection(key).checkout()?.get_all(key)?;
        if raw.is_empty() {
            Err(CommandError::KeyNotFound)?
        }
        let mut target = S::default();
        mapping.apply(&mut raw, &mut target)?;
        return Ok(target);
    }

    /// Delete a whole record. Returns whether the key existed.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// client.delete_record("podcast:1").unwrap();
    /// ```
    pub fn delete_record(&self, key: &str) -> Result<bool, RedmapError> {
        return self.get_connection(key).checkout()?.delete_record(key);
    }

    /// Delete named fields from a record. Returns how many were removed.
    pub fn delete_fields(&self, key: &str, fields: &[&str]) -> Result<u64, RedmapError> {
        if fields.is_empty() {
            Err(CommandError::InvalidArguments)?
        }
        return self.get_connection(key).checkout()?.delete_fields(key, fields);
    }

    /// Check whether a record carries a field.
    pub fn has_field(&self, key: &str, field: &str) -> Result<bool, RedmapError> {
        return self.get_connection(key).checkout()?.has_field(key, field);
    }

    /// Count the fields of a record. Missing keys count zero.
    pub fn record_len(&self, key: &str) -> Result<u64, RedmapError> {
        return self.get_connection(key).checkout()?.record_len(key);
    }

    /// Add `delta` to an integer field, creating it at zero first if absent.
    /// Returns the value after the addition.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// let plays = client.increment_field("podcast:1", "plays", 1).unwrap();
    /// ```
    pub fn increment_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, RedmapError> {
        return self.get_connection(key).checkout()?.increment_field(key, field, delta);
    }

    /// Subtract `delta` from an integer field. Returns the value after the
    /// subtraction.
    pub fn decrement_field(&self, key: &str, field: &str, delta: i64) -> Result<i64, RedmapError> {
        let delta = match delta.checked_neg() {
            Some(delta) => delta,
            None => Err(CommandError::InvalidArguments)?,
        };
        return self.increment_field(key, field, delta);
    }

    /// Expire a record after a duration, rounded down to whole seconds.
    /// Returns false when the key does not exist.
    pub fn expire_record(&self, key: &str, ttl: Duration) -> Result<bool, RedmapError> {
        return self.get_connection(key).checkout()?.expire_record(key, ttl);
    }

    /// Report how much longer the server will keep a record.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// match client.time_to_live("podcast:1").unwrap() {
    ///     redmap::RecordTtl::ExpiresIn(left) => println!("{:?} left", left),
    ///     state => println!("{:?}", state),
    /// }
    /// ```
    pub fn time_to_live(&self, key: &str) -> Result<RecordTtl, RedmapError> {
        return self.get_connection(key).checkout()?.time_to_live(key);
    }

    /// Ping every server behind the client.
    pub fn ping(&self) -> Result<(), RedmapError> {
        for server in self.connections.iter() {
            server.checkout()?.ping()?;
        }
        return Ok(());
    }

    /// Drop every key in the selected database, on every server.
    ///
    /// Example:
    ///
    /// ```rust,no_run
    /// let client = redmap::Client::connect("redis://localhost:6379").unwrap();
    /// client.flush().unwrap();
    /// ```
    pub fn flush(&self) -> Result<(), RedmapError> {
        for server in self.connections.iter() {
            server.checkout()?.flush_db()?;
        }
        return Ok(());
    }
}
