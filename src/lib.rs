/*!
redmap is a [redis](https://redis.io/) hash record client written in pure rust:
every key holds one record, every record is a set of named, typed fields.

# Install:

The crate is called `redmap` and you can depend on it via cargo:

```ini
[dependencies]
redmap = "*"
```

# Features:

- <input type="checkbox"  disabled checked /> All RESP protocol versions
  - <input type="checkbox"  disabled checked /> RESP2
  - <input type="checkbox"  disabled checked /> RESP3
- <input type="checkbox"  disabled /> Connections
  - <input type="checkbox"  disabled checked /> TCP connection
  - <input type="checkbox"  disabled checked/> UNIX Domain socket connection
  - <input type="checkbox"  disabled /> TLS connection
- <input type="checkbox"  disabled /> Encodings
  - <input type="checkbox"  disabled checked /> Typed fields
  - <input type="checkbox"  disabled checked /> JSON fields (`json` feature)
  - <input type="checkbox"  disabled /> Automatically compress
- <input type="checkbox"  disabled checked /> Record mappings: read whole hashes onto plain structs
- <input type="checkbox"  disabled checked /> Multiple server support with custom key hash algorithm
- <input type="checkbox"  disabled checked /> Authority
  - <input type="checkbox"  disabled checked /> Password (AUTH)
  - <input type="checkbox"  disabled checked /> ACL username

# Basic usage:

```rust,no_run
// connect to a redis server node:
let client = redmap::connect("redis://127.0.0.1:6379?timeout=10&tcp_nodelay=true").unwrap();

// flush the database:
client.flush().unwrap();

// write a record as one hash:
let record = redmap::Record::new()
    .field("title", "The WAN Show")
    .field("creator", "Linus Tech Tips")
    .field("category", "technology")
    .field("membership_fee", 9.99);
client.set_record("podcast:1", &record).unwrap();

// read single fields back, typed:
let title: String = client.get_field("podcast:1", "title").unwrap();
assert_eq!(title, "The WAN Show");
let fee: f64 = client.get_field("podcast:1", "membership_fee").unwrap();
assert_eq!(fee, 9.99);

// or map the whole hash onto a struct:
#[derive(Default)]
struct Podcast {
    title: String,
    creator: String,
    membership_fee: f64,
}

let mapping = redmap::RecordMapping::builder()
    .field("title", |p: &mut Podcast, v| p.title = v)
    .field("creator", |p: &mut Podcast, v| p.creator = v)
    .field("membership_fee", |p: &mut Podcast, v| p.membership_fee = v)
    .build()
    .unwrap();
let podcast = client.get_record("podcast:1", &mapping).unwrap();
assert_eq!(podcast.creator, "Linus Tech Tips");

// counters and expiry:
client.increment_field("podcast:1", "plays", 1).unwrap();
client.expire_record("podcast:1", std::time::Duration::from_secs(600)).unwrap();
```
!*/

#![cfg_attr(feature = "cargo-clippy", allow(clippy::needless_return))]

extern crate enum_dispatch;
extern crate log;
extern crate r2d2;
#[cfg(feature = "json")]
extern crate serde;
#[cfg(feature = "json")]
extern crate serde_json;
extern crate url;

mod client;
mod connection;
mod error;
mod protocol;
mod record;
mod stream;
mod value;

pub use crate::client::{Client, Connectable, RecordTtl};
pub use crate::connection::ConnectionManager;
pub use crate::error::{CommandError, DecodeError, MappingError, RedmapError, ServerError};
pub use crate::record::{Record, RecordMapping, RecordMappingBuilder};
pub use crate::stream::Stream;
#[cfg(feature = "json")]
pub use crate::value::Json;
pub use crate::value::{FromFieldValue, ToFieldValue};
pub use r2d2::Error;
pub use url::{ParseError as UrlParseError, Url};

/// R2D2 connection pool
pub type Pool = r2d2::Pool<connection::ConnectionManager>;

/// Create a redis hash record client instance and connect to the server.
///
/// Example:
///
/// ```rust,no_run
/// let client = redmap::connect("redis://localhost:6379").unwrap();
/// ```
pub fn connect<C: Connectable>(target: C) -> Result<Client, RedmapError> {
    Client::connect(target)
}
