#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

type Record = HashMap<String, Vec<u8>>;

#[derive(Default)]
struct State {
    records: Mutex<HashMap<String, Record>>,
    ttls: Mutex<HashMap<String, i64>>,
    connections: AtomicUsize,
}

/// A miniature redis standing on a random local port: enough of the RESP
/// command set for the hash record client, in both RESP2 and RESP3 reply
/// modes. State is shared across connections, so a client that redials
/// keeps seeing its data.
pub struct FakeRedis {
    addr: SocketAddr,
    state: Arc<State>,
}

impl FakeRedis {
    pub fn start() -> FakeRedis {
        FakeRedis::spawn(None, None)
    }

    /// Require AUTH (or a HELLO carrying credentials) before serving.
    pub fn with_password(password: &str) -> FakeRedis {
        FakeRedis::spawn(Some(password.to_string()), None)
    }

    /// Close every connection after it has served this many commands.
    pub fn dropping_after(commands: usize) -> FakeRedis {
        FakeRedis::spawn(None, Some(commands))
    }

    fn spawn(password: Option<String>, drop_after: Option<usize>) -> FakeRedis {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(State::default());
        let server_state = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                let state = server_state.clone();
                let password = password.clone();
                thread::spawn(move || serve(stream, state, password, drop_after));
            }
        });
        FakeRedis { addr, state }
    }

    pub fn url(&self) -> String {
        format!("redis://{}", self.addr)
    }

    pub fn url_with(&self, query: &str) -> String {
        format!("redis://{}?{}", self.addr, query)
    }

    /// `credentials` is the userinfo part of the URL, e.g. `:secret` or
    /// `reader:secret`.
    pub fn authed_url(&self, credentials: &str) -> String {
        format!("redis://{}@{}", credentials, self.addr)
    }

    /// How many connections the server has accepted so far.
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }
}

fn serve(stream: TcpStream, state: Arc<State>, password: Option<String>, drop_after: Option<usize>) {
    state.connections.fetch_add(1, Ordering::SeqCst);
    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(_) => return,
    };
    let mut reader = BufReader::new(stream);
    let mut resp3 = false;
    let mut authed = password.is_none();
    let mut served = 0usize;

    loop {
        if drop_after.map_or(false, |limit| served >= limit) {
            return;
        }
        let args = match read_command(&mut reader) {
            Ok(Some(args)) => args,
            _ => return,
        };
        served += 1;
        let command = String::from_utf8_lossy(&args[0]).to_uppercase();
        match command.as_str() {
            "HELLO" => {
                if args.get(1).map(|arg| arg.as_slice()) != Some(b"3".as_ref()) {
                    write_error(&mut writer, "NOPROTO unsupported protocol version");
                    continue;
                }
                if let Some(ref expected) = password {
                    match args.get(4) {
                        Some(given) if given.as_slice() == expected.as_bytes() => authed = true,
                        _ => {
                            write_error(&mut writer, "ERR invalid password");
                            continue;
                        }
                    }
                }
                resp3 = true;
                let _ = writer.write_all(b"%1\r\n$5\r\nproto\r\n:3\r\n");
                let _ = writer.flush();
            }
            "AUTH" => match password {
                Some(ref expected)
                    if args.last().map(|arg| arg.as_slice()) == Some(expected.as_bytes()) =>
                {
                    authed = true;
                    write_simple(&mut writer, "OK");
                }
                Some(_) => write_error(&mut writer, "ERR invalid password"),
                None => write_error(&mut writer, "ERR Client sent AUTH, but no password is set"),
            },
            _ if !authed => write_error(&mut writer, "NOAUTH Authentication required."),
            "PING" => write_simple(&mut writer, "PONG"),
            "SELECT" => write_simple(&mut writer, "OK"),
            "FLUSHDB" => {
                state.records.lock().unwrap().clear();
                state.ttls.lock().unwrap().clear();
                write_simple(&mut writer, "OK");
            }
            "HSET" => {
                if args.len() < 4 || args.len() % 2 != 0 {
                    write_error(&mut writer, "ERR wrong number of arguments for 'hset' command");
                    continue;
                }
                let mut records = state.records.lock().unwrap();
                let record = records.entry(text(&args[1])).or_insert_with(HashMap::new);
                let mut added = 0i64;
                for pair in args[2..].chunks(2) {
                    if record.insert(text(&pair[0]), pair[1].clone()).is_none() {
                        added += 1;
                    }
                }
                write_integer(&mut writer, added);
            }
            "HGET" => {
                let records = state.records.lock().unwrap();
                let value = records
                    .get(&text(&args[1]))
                    .and_then(|record| record.get(text(&args[2]).as_str()));
                match value {
                    Some(value) => write_bulk(&mut writer, value),
                    None => write_nil(&mut writer, resp3),
                }
            }
            "HGETALL" => {
                let records = state.records.lock().unwrap();
                let empty = HashMap::new();
                let record = records.get(&text(&args[1])).unwrap_or(&empty);
                let header = if resp3 {
                    format!("%{}\r\n", record.len())
                } else {
                    format!("*{}\r\n", record.len() * 2)
                };
                let _ = writer.write_all(header.as_bytes());
                for (field, value) in record.iter() {
                    write_bulk(&mut writer, field.as_bytes());
                    write_bulk(&mut writer, value);
                }
                let _ = writer.flush();
            }
            "HDEL" => {
                let key = text(&args[1]);
                let mut records = state.records.lock().unwrap();
                let mut deleted = 0i64;
                if let Some(record) = records.get_mut(&key) {
                    for field in &args[2..] {
                        if record.remove(text(field).as_str()).is_some() {
                            deleted += 1;
                        }
                    }
                    if record.is_empty() {
                        records.remove(&key);
                    }
                }
                write_integer(&mut writer, deleted);
            }
            "DEL" => {
                let mut records = state.records.lock().unwrap();
                let mut deleted = 0i64;
                for key in &args[1..] {
                    if records.remove(&text(key)).is_some() {
                        deleted += 1;
                    }
                }
                write_integer(&mut writer, deleted);
            }
            "HEXISTS" => {
                let records = state.records.lock().unwrap();
                let found = records
                    .get(&text(&args[1]))
                    .map_or(false, |record| record.contains_key(text(&args[2]).as_str()));
                write_integer(&mut writer, if found { 1 } else { 0 });
            }
            "HLEN" => {
                let records = state.records.lock().unwrap();
                let len = records.get(&text(&args[1])).map_or(0, |record| record.len() as i64);
                write_integer(&mut writer, len);
            }
            "HINCRBY" => {
                let delta: i64 = match text(&args[3]).parse() {
                    Ok(delta) => delta,
                    Err(_) => {
                        write_error(&mut writer, "ERR value is not an integer or out of range");
                        continue;
                    }
                };
                let mut records = state.records.lock().unwrap();
                let record = records.entry(text(&args[1])).or_insert_with(HashMap::new);
                let field = text(&args[2]);
                let current: i64 = match record.get(&field).map(|value| text(value).parse()) {
                    None => 0,
                    Some(Ok(current)) => current,
                    Some(Err(_)) => {
                        write_error(&mut writer, "ERR hash value is not an integer");
                        continue;
                    }
                };
                let next = current + delta;
                record.insert(field, next.to_string().into_bytes());
                write_integer(&mut writer, next);
            }
            "EXPIRE" => {
                let key = text(&args[1]);
                let exists = state.records.lock().unwrap().contains_key(&key);
                if exists {
                    let seconds: i64 = text(&args[2]).parse().unwrap_or(0);
                    state.ttls.lock().unwrap().insert(key, seconds);
                }
                write_integer(&mut writer, if exists { 1 } else { 0 });
            }
            "TTL" => {
                let key = text(&args[1]);
                let exists = state.records.lock().unwrap().contains_key(&key);
                let reply = if exists {
                    state.ttls.lock().unwrap().get(&key).copied().unwrap_or(-1)
                } else {
                    -2
                };
                write_integer(&mut writer, reply);
            }
            _ => write_error(&mut writer, &format!("ERR unknown command '{}'", command)),
        }
    }
}

fn text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn read_command(reader: &mut BufReader<TcpStream>) -> io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    if read_line(reader, &mut line)?.is_none() {
        return Ok(None);
    }
    if line.first() != Some(&b'*') {
        return Err(invalid("expected an array header"));
    }
    let count = parse_len(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        if read_line(reader, &mut line)?.is_none() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "eof inside a command"));
        }
        if line.first() != Some(&b'$') {
            return Err(invalid("expected a bulk header"));
        }
        let len = parse_len(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(invalid("bulk argument not terminated"));
        }
        args.push(data);
    }
    if args.is_empty() {
        return Err(invalid("empty command"));
    }
    Ok(Some(args))
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> io::Result<Option<()>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(invalid("line not terminated with crlf"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_len(digits: &[u8]) -> io::Result<usize> {
    let text = std::str::from_utf8(digits).map_err(|_| invalid("length is not utf-8"))?;
    text.parse::<usize>().map_err(|_| invalid("length is not a number"))
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

fn write_simple(stream: &mut TcpStream, message: &str) {
    let _ = stream.write_all(b"+");
    let _ = stream.write_all(message.as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_error(stream: &mut TcpStream, message: &str) {
    let _ = stream.write_all(b"-");
    let _ = stream.write_all(message.as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_integer(stream: &mut TcpStream, value: i64) {
    let _ = stream.write_all(b":");
    let _ = stream.write_all(value.to_string().as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_bulk(stream: &mut TcpStream, data: &[u8]) {
    let _ = stream.write_all(b"$");
    let _ = stream.write_all(data.len().to_string().as_bytes());
    let _ = stream.write_all(b"\r\n");
    let _ = stream.write_all(data);
    let _ = stream.write_all(b"\r\n");
    let _ = stream.flush();
}

fn write_nil(stream: &mut TcpStream, resp3: bool) {
    let frame: &[u8] = if resp3 { b"_\r\n" } else { b"$-1\r\n" };
    let _ = stream.write_all(frame);
    let _ = stream.flush();
}
