use crate::connection::Auth;
use crate::error::{RedmapError, ServerError};
use crate::protocol::frame::{self, Frame};
use crate::protocol::ProtocolTrait;
use std::borrow::Cow;
use std::io::{BufReader, Read, Write};

/// The RESP3 protocol: negotiated with HELLO, replies with typed frames
/// (maps, doubles, booleans) and may interleave out-of-band push frames,
/// which this client skips.
pub struct Resp3Protocol<C: Read + Write + Sized> {
    reader: BufReader<C>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    broken: bool,
}

impl<C: Read + Write + Sized> Resp3Protocol<C> {
    pub(crate) fn new(stream: C) -> Resp3Protocol<C> {
        Resp3Protocol {
            reader: BufReader::new(stream),
            line_buf: Vec::new(),
            write_buf: Vec::new(),
            broken: false,
        }
    }

    pub(crate) fn stream(&mut self) -> &mut C {
        self.reader.get_mut()
    }

    fn exchange(&mut self) -> Result<Frame, RedmapError> {
        self.reader.get_mut().write_all(&self.write_buf)?;
        self.reader.get_mut().flush()?;
        loop {
            match frame::read_frame(&mut self.reader, &mut self.line_buf)? {
                // Server-initiated notifications, not replies to us.
                Frame::Push(_) => continue,
                frame => return Ok(frame),
            }
        }
    }
}

impl<C: Read + Write + Sized> ProtocolTrait for Resp3Protocol<C> {
    fn roundtrip(&mut self, args: &[&[u8]]) -> Result<Frame, RedmapError> {
        self.write_buf.clear();
        frame::encode_command(args, &mut self.write_buf);
        match self.exchange() {
            Ok(frame) => Ok(frame),
            Err(err) => {
                if err.is_transport() {
                    self.broken = true;
                }
                Err(err)
            }
        }
    }

    fn handshake(&mut self, auth: Option<&Auth>, db: u32) -> Result<(), RedmapError> {
        let reply = match auth {
            Some(auth) => {
                let username = auth.username.as_deref().unwrap_or("default");
                self.roundtrip(&[
                    b"HELLO",
                    b"3",
                    b"AUTH",
                    username.as_bytes(),
                    auth.password.as_bytes(),
                ])?
            }
            None => self.roundtrip(&[b"HELLO", b"3"])?,
        };
        match reply {
            Frame::Map(_) => {}
            Frame::Error(message) => Err(ServerError::Error(message))?,
            _ => Err(ServerError::BadResponse(Cow::Borrowed("unexpected HELLO reply")))?,
        }
        if db > 0 {
            let db = db.to_string();
            frame::expect_ok(self.roundtrip(&[b"SELECT", db.as_bytes()])?)?;
        }
        Ok(())
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}
