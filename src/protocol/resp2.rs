use crate::connection::Auth;
use crate::error::{RedmapError, ServerError};
use crate::protocol::frame::{self, Frame};
use crate::protocol::ProtocolTrait;
use std::borrow::Cow;
use std::io::{BufReader, Read, Write};

/// The classic request/reply protocol spoken by every server version.
pub struct Resp2Protocol<C: Read + Write + Sized> {
    reader: BufReader<C>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    broken: bool,
}

impl<C: Read + Write + Sized> Resp2Protocol<C> {
    pub(crate) fn new(stream: C) -> Resp2Protocol<C> {
        Resp2Protocol {
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
        match frame::read_frame(&mut self.reader, &mut self.line_buf)? {
            Frame::Map(_) | Frame::Set(_) | Frame::Double(_) | Frame::Boolean(_) | Frame::Push(_) => {
                Err(ServerError::BadResponse(Cow::Borrowed(
                    "RESP3 frame on a RESP2 connection",
                )))?
            }
            frame => Ok(frame),
        }
    }
}

impl<C: Read + Write + Sized> ProtocolTrait for Resp2Protocol<C> {
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
        if let Some(auth) = auth {
            let reply = match auth.username {
                Some(ref username) => {
                    self.roundtrip(&[b"AUTH", username.as_bytes(), auth.password.as_bytes()])?
                }
                None => self.roundtrip(&[b"AUTH", auth.password.as_bytes()])?,
            };
            frame::expect_ok(reply)?;
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
