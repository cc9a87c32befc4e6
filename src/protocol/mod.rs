pub(crate) mod frame;
mod resp2;
mod resp3;

use crate::client::RecordTtl;
use crate::connection::Auth;
use crate::error::{RedmapError, ServerError};
use crate::protocol::frame::Frame;
pub(crate) use crate::protocol::resp2::Resp2Protocol;
pub(crate) use crate::protocol::resp3::Resp3Protocol;
use crate::record::Record;
use crate::stream::Stream;
use enum_dispatch::enum_dispatch;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

#[enum_dispatch]
pub enum Protocol {
    Resp2(Resp2Protocol<Stream>),
    Resp3(Resp3Protocol<Stream>),
}

/// The command surface both protocol versions provide. RESP2 and RESP3
/// share the command encoding, so every operation is a default method over
/// [`roundtrip`](ProtocolTrait::roundtrip); the versions differ in session
/// setup and in which reply frames they accept.
#[enum_dispatch(Protocol)]
pub trait ProtocolTrait {
    /// Sends one command and reads its reply. Transport and framing
    /// failures flag the connection broken before they surface.
    fn roundtrip(&mut self, args: &[&[u8]]) -> Result<Frame, RedmapError>;

    /// Session setup right after the stream opens: protocol negotiation,
    /// authentication and database selection.
    fn handshake(&mut self, auth: Option<&Auth>, db: u32) -> Result<(), RedmapError>;

    /// True once a failed exchange has left the stream in an unknown state.
    fn is_broken(&self) -> bool;

    fn ping(&mut self) -> Result<(), RedmapError> {
        frame::expect_pong(self.roundtrip(&[b"PING"])?)
    }

    fn flush_db(&mut self) -> Result<(), RedmapError> {
        frame::expect_ok(self.roundtrip(&[b"FLUSHDB"])?)
    }

    fn set_record(&mut self, key: &str, record: &Record) -> Result<(), RedmapError> {
        let pairs = record.pairs();
        let mut args: Vec<&[u8]> = Vec::with_capacity(2 + pairs.len() * 2);
        args.push(b"HSET");
        args.push(key.as_bytes());
        for (name, value) in pairs {
            args.push(name.as_bytes());
            args.push(value.as_slice());
        }
        frame::expect_ok(self.roundtrip(&args)?)
    }

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>, RedmapError> {
        frame::expect_bulk(self.roundtrip(&[b"HGET", key.as_bytes(), field.as_bytes()])?)
    }

    fn get_all(&mut self, key: &str) -> Result<HashMap<String, Vec<u8>>, RedmapError> {
        let reply = self.roundtrip(&[b"HGETALL", key.as_bytes()])?;
        Ok(frame::expect_pairs(reply)?.into_iter().collect())
    }

    fn delete_record(&mut self, key: &str) -> Result<bool, RedmapError> {
        let deleted = frame::expect_integer(self.roundtrip(&[b"DEL", key.as_bytes()])?)?;
        Ok(deleted > 0)
    }

    fn delete_fields(&mut self, key: &str, fields: &[&str]) -> Result<u64, RedmapError> {
        let mut args: Vec<&[u8]> = Vec::with_capacity(2 + fields.len());
        args.push(b"HDEL");
        args.push(key.as_bytes());
        for field in fields {
            args.push(field.as_bytes());
        }
        let deleted = frame::expect_integer(self.roundtrip(&args)?)?;
        Ok(deleted.max(0) as u64)
    }

    fn has_field(&mut self, key: &str, field: &str) -> Result<bool, RedmapError> {
        let found =
            frame::expect_integer(self.roundtrip(&[b"HEXISTS", key.as_bytes(), field.as_bytes()])?)?;
        Ok(found != 0)
    }

    fn record_len(&mut self, key: &str) -> Result<u64, RedmapError> {
        let len = frame::expect_integer(self.roundtrip(&[b"HLEN", key.as_bytes()])?)?;
        Ok(len.max(0) as u64)
    }

    fn increment_field(&mut self, key: &str, field: &str, delta: i64) -> Result<i64, RedmapError> {
        let delta = delta.to_string();
        let reply = self.roundtrip(&[b"HINCRBY", key.as_bytes(), field.as_bytes(), delta.as_bytes()])?;
        frame::expect_integer(reply)
    }

    fn expire_record(&mut self, key: &str, ttl: Duration) -> Result<bool, RedmapError> {
        let seconds = ttl.as_secs().to_string();
        let reply = self.roundtrip(&[b"EXPIRE", key.as_bytes(), seconds.as_bytes()])?;
        Ok(frame::expect_integer(reply)? != 0)
    }

    fn time_to_live(&mut self, key: &str) -> Result<RecordTtl, RedmapError> {
        match frame::expect_integer(self.roundtrip(&[b"TTL", key.as_bytes()])?)? {
            -2 => Ok(RecordTtl::Missing),
            -1 => Ok(RecordTtl::NoExpiry),
            seconds if seconds >= 0 => Ok(RecordTtl::ExpiresIn(Duration::from_secs(seconds as u64))),
            _ => Err(ServerError::BadResponse(Cow::Borrowed("negative TTL in reply")))?,
        }
    }
}
