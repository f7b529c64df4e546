use crate::protocol::Status;

/// Largest request the server reads; anything longer is cut at this size.
pub const MAX_REQUEST_LEN: usize = 128;

/// A parsed request. Item ids and secrets are kept as raw bytes and checked
/// by the handler: a malformed id is `NotFound` and a wrong secret is
/// `Unauthorized`, never a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Ctrl(u8),
    Info(Vec<u8>),
    List { media_type: i64, offset: i64, length: i64 },
    Play(Vec<u8>),
    Restart(Vec<u8>),
    Shutdown(Vec<u8>),
    Stat,
    Stop,
}

/// Parse one raw request.
///
/// `CTRL` must be followed by exactly one byte, which may itself be a space
/// or newline. Secrets must match byte for byte, so `RESTART` and `SHUTDOWN`
/// see the request exactly as read. For every other verb one trailing line
/// terminator is ignored. `STAT` and `STOP` match by prefix. Every parse
/// failure is a bad request; range checks belong to the handlers.
pub fn parse(raw: &[u8]) -> Result<Request, Status> {
    if let Some(byte) = ctrl_byte(raw) {
        return Ok(Request::Ctrl(byte));
    }

    if let Some(secret) = argument(raw, b"RESTART ") {
        return Ok(Request::Restart(secret.to_vec()));
    }
    if let Some(secret) = argument(raw, b"SHUTDOWN ") {
        return Ok(Request::Shutdown(secret.to_vec()));
    }

    let line = strip_line_ending(raw);
    if let Some(byte) = ctrl_byte(line) {
        return Ok(Request::Ctrl(byte));
    }

    if let Some(rest) = argument(line, b"INFO ") {
        return Ok(Request::Info(rest.to_vec()));
    }
    if let Some(rest) = argument(line, b"LIST ") {
        return parse_list(rest);
    }
    if let Some(rest) = argument(line, b"PLAY ") {
        return Ok(Request::Play(rest.to_vec()));
    }
    if line.starts_with(b"STAT") {
        return Ok(Request::Stat);
    }
    if line.starts_with(b"STOP") {
        return Ok(Request::Stop);
    }

    Err(Status::BadRequest)
}

fn ctrl_byte(line: &[u8]) -> Option<u8> {
    match line {
        [b'C', b'T', b'R', b'L', b' ', byte] => Some(*byte),
        _ => None,
    }
}

fn strip_line_ending(raw: &[u8]) -> &[u8] {
    raw.strip_suffix(b"\r\n")
        .or_else(|| raw.strip_suffix(b"\n"))
        .unwrap_or(raw)
}

/// Text after `verb`, which must be non-empty.
fn argument<'a>(line: &'a [u8], verb: &[u8]) -> Option<&'a [u8]> {
    line.strip_prefix(verb).filter(|rest| !rest.is_empty())
}

/// Decode an INFO or PLAY argument. Anything that is not a plain decimal
/// `u32` cannot name an item.
pub fn item_id(arg: &[u8]) -> Option<u32> {
    std::str::from_utf8(arg).ok()?.parse().ok()
}

fn parse_list(rest: &[u8]) -> Result<Request, Status> {
    let text = std::str::from_utf8(rest).map_err(|_| Status::BadRequest)?;
    let mut fields = text.split(' ').map(str::parse::<i64>);
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(Ok(media_type)), Some(Ok(offset)), Some(Ok(length)), None) => Ok(Request::List {
            media_type,
            offset,
            length,
        }),
        _ => Err(Status::BadRequest),
    }
}
