//! An example of how to setup a connection pool for redis
//! connections.
//! Run the example with:
//!
//! ```not_rust
//! cargo run -p demo-pooled
//! ```

use redmap::{Client, ConnectionManager, Pool, Record, Url};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let localhost = Url::parse("redis://localhost:6379")?;
    let pool = Pool::builder().max_size(10).build(ConnectionManager::new(localhost))?;
    let client = Client::with_pool(pool)?;

    // writes a record through a pooled connection
    let record = Record::new().field("title", "The WAN Show").field("plays", 100);
    client.set_record("podcast:1", &record)?;

    // bumps a counter field
    let plays = client.increment_field("podcast:1", "plays", 1)?;
    println!("plays: {}", plays);

    // deletes the record
    client.delete_record("podcast:1")?;
    Ok(())
}
