//! A simple example of using the redmap crate, which
//! connects to a redis server, writes a podcast as a hash
//! record, and reads it back field by field and as a whole
//! mapped struct.
//! Run the example with:
//!
//! ```not_rust
//! cargo run -p demo-podcast
//! ```

use redmap::{connect, Record, RecordMapping};

#[derive(Debug, Default)]
struct Podcast {
    title: String,
    creator: String,
    category: String,
    membership_fee: f64,
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let localhost = "redis://localhost:6379";
    let client = connect(localhost).expect("Couldn't connect to redis");

    // writes every field of the record in one round trip
    let record = Record::new()
        .field("title", "The WAN Show")
        .field("creator", "Linus Tech Tips")
        .field("category", "technology")
        .field("membership_fee", 9.99f64);
    client.set_record("podcast:1", &record)?;

    // reads single fields back, as text and as a number
    let title: String = client.get_field("podcast:1", "title")?;
    println!("title: {}", title);
    let fee: f64 = client.get_field("podcast:1", "membership_fee")?;
    println!("membership fee: {}", fee);

    // reads the whole record into a struct
    let mapping = RecordMapping::builder()
        .field("title", |podcast: &mut Podcast, title| podcast.title = title)
        .field("creator", |podcast: &mut Podcast, creator| podcast.creator = creator)
        .field("category", |podcast: &mut Podcast, category| podcast.category = category)
        .field("membership_fee", |podcast: &mut Podcast, fee| podcast.membership_fee = fee)
        .build()?;
    let podcast: Podcast = client.get_record("podcast:1", &mapping)?;
    println!("{:?}", podcast);

    client.delete_record("podcast:1")?;

    Ok(())
}
