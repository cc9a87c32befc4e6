//! RESP framing: command encoding and reply parsing shared by both
//! protocol versions. Bulk payloads are raw bytes; only reply type lines
//! are assumed to be text.

use crate::error::{RedmapError, ServerError};
use std::borrow::Cow;
use std::io;
use std::io::{BufRead, Read};

/// One parsed reply frame. RESP2 produces the first five kinds; the rest
/// arrive only on RESP3 connections.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Vec<Frame>),
    Map(Vec<(Frame, Frame)>),
    Set(Vec<Frame>),
    Double(f64),
    Boolean(bool),
    Null,
    Push(Vec<Frame>),
}

/// Appends one command in RESP array form to `out`.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    out.push(b'*');
    out.extend_from_slice(args.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    for arg in args {
        out.push(b'$');
        out.extend_from_slice(arg.len().to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// Reads one frame from the buffered reader. `line_buf` is scratch space
/// reused across calls.
pub fn read_frame<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> Result<Frame, RedmapError> {
    read_line(reader, line_buf)?;
    if line_buf.is_empty() {
        return Err(bad_frame("empty reply line"));
    }
    let kind = line_buf[0];
    match kind {
        b'+' => Ok(Frame::Simple(lossy(&line_buf[1..]))),
        b'-' => Ok(Frame::Error(lossy(&line_buf[1..]))),
        b':' => Ok(Frame::Integer(parse_int(&line_buf[1..])?)),
        b'$' => {
            let len = parse_int(&line_buf[1..])?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_int(&line_buf[1..])?;
            if len < 0 {
                return Ok(Frame::Null);
            }
            Ok(Frame::Array(read_items(reader, line_buf, len as usize)?))
        }
        b'%' => {
            let len = parse_int(&line_buf[1..])?;
            Ok(Frame::Map(read_pair_items(reader, line_buf, len.max(0) as usize)?))
        }
        b'~' => {
            let len = parse_int(&line_buf[1..])?;
            Ok(Frame::Set(read_items(reader, line_buf, len.max(0) as usize)?))
        }
        b',' => {
            let s = std::str::from_utf8(&line_buf[1..])
                .map_err(|_| bad_frame("malformed double in reply"))?;
            let value = s.parse::<f64>().map_err(|_| bad_frame("malformed double in reply"))?;
            Ok(Frame::Double(value))
        }
        b'#' => match &line_buf[1..] {
            b"t" => Ok(Frame::Boolean(true)),
            b"f" => Ok(Frame::Boolean(false)),
            _ => Err(bad_frame("malformed boolean in reply")),
        },
        b'_' => Ok(Frame::Null),
        b'>' => {
            let len = parse_int(&line_buf[1..])?;
            Ok(Frame::Push(read_items(reader, line_buf, len.max(0) as usize)?))
        }
        b'|' => {
            // Attribute frames decorate the reply that follows; nothing in
            // this client consumes them, so parse and drop.
            let len = parse_int(&line_buf[1..])?;
            read_pair_items(reader, line_buf, len.max(0) as usize)?;
            read_frame(reader, line_buf)
        }
        _ => Err(bad_frame("unknown reply type")),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> Result<Frame, RedmapError> {
    if len < 0 {
        return Ok(Frame::Bulk(None));
    }
    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data)?;
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != *b"\r\n" {
        return Err(bad_frame("bulk reply is not CRLF terminated"));
    }
    Ok(Frame::Bulk(Some(data)))
}

fn read_items<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    len: usize,
) -> Result<Vec<Frame>, RedmapError> {
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(read_frame(reader, line_buf)?);
    }
    Ok(items)
}

fn read_pair_items<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    len: usize,
) -> Result<Vec<(Frame, Frame)>, RedmapError> {
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        let key = read_frame(reader, line_buf)?;
        let value = read_frame(reader, line_buf)?;
        items.push((key, value));
    }
    Ok(items)
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<(), RedmapError> {
    buf.clear();
    // Cap the line so a desynchronized stream cannot grow the buffer without
    // bound; bulk payloads are length-prefixed and bypass this path.
    let bytes = reader.take(4096).read_until(b'\n', buf)?;
    if bytes == 0 || !buf.ends_with(b"\n") {
        if bytes == 4096 {
            return Err(bad_frame("reply line exceeds 4096 bytes"));
        }
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed by the server",
        ))?;
    }
    if !buf.ends_with(b"\r\n") {
        return Err(bad_frame("reply line is not CRLF terminated"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_int(data: &[u8]) -> Result<i64, RedmapError> {
    let s = std::str::from_utf8(data).map_err(|_| bad_frame("malformed integer in reply"))?;
    s.parse::<i64>().map_err(|_| bad_frame("malformed integer in reply"))
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn bad_frame(message: &'static str) -> RedmapError {
    ServerError::BadResponse(Cow::Borrowed(message)).into()
}

/// An acknowledgement: `+OK` or the integer count commands like HSET reply
/// with.
pub fn expect_ok(frame: Frame) -> Result<(), RedmapError> {
    match frame {
        Frame::Simple(_) => Ok(()),
        Frame::Integer(_) => Ok(()),
        Frame::Error(message) => Err(ServerError::Error(message))?,
        _ => Err(bad_frame("expected an acknowledgement reply")),
    }
}

pub fn expect_integer(frame: Frame) -> Result<i64, RedmapError> {
    match frame {
        Frame::Integer(value) => Ok(value),
        Frame::Error(message) => Err(ServerError::Error(message))?,
        _ => Err(bad_frame("expected an integer reply")),
    }
}

pub fn expect_bulk(frame: Frame) -> Result<Option<Vec<u8>>, RedmapError> {
    match frame {
        Frame::Bulk(value) => Ok(value),
        Frame::Null => Ok(None),
        Frame::Error(message) => Err(ServerError::Error(message))?,
        _ => Err(bad_frame("expected a bulk reply")),
    }
}

pub fn expect_pong(frame: Frame) -> Result<(), RedmapError> {
    match frame {
        Frame::Simple(ref s) if s == "PONG" => Ok(()),
        Frame::Error(message) => Err(ServerError::Error(message))?,
        _ => Err(bad_frame("expected a PONG reply")),
    }
}

/// Field and value pairs from HGETALL: a flat array on RESP2, a map frame
/// on RESP3. Field names must be UTF-8; values stay raw.
pub fn expect_pairs(frame: Frame) -> Result<Vec<(String, Vec<u8>)>, RedmapError> {
    match frame {
        Frame::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(bad_frame("field array has an odd number of entries"));
            }
            let mut pairs = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(name), Some(value)) = (items.next(), items.next()) {
                pairs.push((pair_name(name)?, pair_value(value)?));
            }
            Ok(pairs)
        }
        Frame::Map(entries) => {
            let mut pairs = Vec::with_capacity(entries.len());
            for (name, value) in entries {
                pairs.push((pair_name(name)?, pair_value(value)?));
            }
            Ok(pairs)
        }
        Frame::Error(message) => Err(ServerError::Error(message))?,
        _ => Err(bad_frame("expected a field map reply")),
    }
}

fn pair_name(frame: Frame) -> Result<String, RedmapError> {
    match frame {
        Frame::Bulk(Some(name)) => Ok(String::from_utf8(name)?),
        Frame::Simple(name) => Ok(name),
        _ => Err(bad_frame("field name is not a string")),
    }
}

fn pair_value(frame: Frame) -> Result<Vec<u8>, RedmapError> {
    match frame {
        Frame::Bulk(Some(value)) => Ok(value),
        Frame::Simple(value) => Ok(value.into_bytes()),
        _ => Err(bad_frame("field value is not a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, RedmapError, ServerError};
    use std::io::Cursor;

    fn parse(raw: &[u8]) -> Result<Frame, RedmapError> {
        let mut reader = Cursor::new(raw.to_vec());
        let mut line_buf = Vec::new();
        read_frame(&mut reader, &mut line_buf)
    }

    #[test]
    fn encodes_command() {
        let mut buf = Vec::new();
        encode_command(&[b"HGET", b"podcast:1", b"title"], &mut buf);
        assert_eq!(&buf, b"*3\r\n$4\r\nHGET\r\n$9\r\npodcast:1\r\n$5\r\ntitle\r\n");
    }

    #[test]
    fn parses_simple_and_error() {
        assert_eq!(parse(b"+OK\r\n").unwrap(), Frame::Simple("OK".to_string()));
        assert_eq!(
            parse(b"-ERR unknown command\r\n").unwrap(),
            Frame::Error("ERR unknown command".to_string())
        );
    }

    #[test]
    fn parses_integers() {
        assert_eq!(parse(b":42\r\n").unwrap(), Frame::Integer(42));
        assert_eq!(parse(b":-2\r\n").unwrap(), Frame::Integer(-2));
    }

    #[test]
    fn parses_bulk_strings() {
        assert_eq!(
            parse(b"$5\r\nhello\r\n").unwrap(),
            Frame::Bulk(Some(b"hello".to_vec()))
        );
        assert_eq!(parse(b"$-1\r\n").unwrap(), Frame::Bulk(None));
        assert_eq!(parse(b"$0\r\n\r\n").unwrap(), Frame::Bulk(Some(Vec::new())));
    }

    #[test]
    fn parses_flat_pair_array() {
        let frame = parse(b"*4\r\n$5\r\ntitle\r\n$12\r\nThe WAN Show\r\n$3\r\nfee\r\n$4\r\n9.99\r\n").unwrap();
        let pairs = expect_pairs(frame).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("title".to_string(), b"The WAN Show".to_vec()),
                ("fee".to_string(), b"9.99".to_vec()),
            ]
        );
    }

    #[test]
    fn parses_resp3_map() {
        let frame = parse(b"%2\r\n$5\r\ntitle\r\n$12\r\nThe WAN Show\r\n$3\r\nfee\r\n$4\r\n9.99\r\n").unwrap();
        let pairs = expect_pairs(frame).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("fee".to_string(), b"9.99".to_vec()));
    }

    #[test]
    fn parses_resp3_scalars() {
        assert_eq!(parse(b"#t\r\n").unwrap(), Frame::Boolean(true));
        assert_eq!(parse(b"#f\r\n").unwrap(), Frame::Boolean(false));
        assert_eq!(parse(b"_\r\n").unwrap(), Frame::Null);
        assert_eq!(parse(b",9.99\r\n").unwrap(), Frame::Double(9.99));
    }

    #[test]
    fn unwraps_attribute_frames() {
        let frame = parse(b"|1\r\n$3\r\nttl\r\n:60\r\n$5\r\nhello\r\n").unwrap();
        assert_eq!(frame, Frame::Bulk(Some(b"hello".to_vec())));
    }

    #[test]
    fn rejects_unterminated_lines() {
        let err = parse(b"+OK\n").unwrap_err();
        assert!(matches!(
            err,
            RedmapError::Server(ServerError::BadResponse(_))
        ));
    }

    #[test]
    fn closed_stream_is_an_io_error() {
        let err = parse(b"").unwrap_err();
        assert!(matches!(err, RedmapError::Io(_)));
        let err = parse(b"$5\r\nhe").unwrap_err();
        assert!(matches!(err, RedmapError::Io(_)));
    }

    #[test]
    fn oversized_reply_lines_are_rejected() {
        let mut raw = vec![b'+'];
        raw.resize(6000, b'x');
        raw.extend_from_slice(b"\r\n");
        assert!(matches!(
            parse(&raw).unwrap_err(),
            RedmapError::Server(ServerError::BadResponse(_))
        ));
        // a short line the server never finished still reads as a hangup
        assert!(matches!(parse(b"+abc").unwrap_err(), RedmapError::Io(_)));
    }

    #[test]
    fn rejects_unknown_type_bytes() {
        let err = parse(b"@boom\r\n").unwrap_err();
        assert!(matches!(
            err,
            RedmapError::Server(ServerError::BadResponse(_))
        ));
    }

    #[test]
    fn error_frames_become_server_errors() {
        let frame = parse(b"-WRONGTYPE Operation against a key\r\n").unwrap();
        let err = expect_integer(frame).unwrap_err();
        match err {
            RedmapError::Server(ServerError::Error(message)) => {
                assert!(message.starts_with("WRONGTYPE"))
            }
            other => panic!("expected a server error, got {:?}", other),
        }
    }

    #[test]
    fn pair_names_must_be_utf8() {
        let frame = Frame::Map(vec![(
            Frame::Bulk(Some(vec![0xff, 0xfe])),
            Frame::Bulk(Some(b"x".to_vec())),
        )]);
        let err = expect_pairs(frame).unwrap_err();
        assert!(matches!(
            err,
            RedmapError::Decode(DecodeError::String(_))
        ));
    }
}
