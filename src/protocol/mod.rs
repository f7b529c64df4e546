//! Wire protocol: one request per connection, answered by a status line and,
//! for STAT, LIST and INFO, an XML payload.

pub mod encode;
pub mod request;

use std::fmt;

/// Leading token of every response.
pub const PROTOCOL_VERSION: &str = "MCP/0.1";

/// Response status. The numbering echoes HTTP but is its own enumeration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    BadParams,
    Unauthorized,
    ServerError,
    ItemPlaying,
    NotFound,
    TooLong,
    NotImplemented,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 401,
            Status::BadParams => 402,
            Status::Unauthorized => 403,
            Status::ServerError => 500,
            Status::ItemPlaying => 501,
            Status::NotFound => 502,
            Status::TooLong => 503,
            Status::NotImplemented => 504,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::BadParams => "Bad Parameters",
            Status::Unauthorized => "Unauthorized",
            Status::ServerError => "Server Error",
            Status::ItemPlaying => "Item Already Playing",
            Status::NotFound => "Not Found",
            Status::TooLong => "Message Too Long",
            Status::NotImplemented => "Not Implemented",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// `MCP/0.1 <code> <reason>` followed by a newline.
pub fn status_line(status: Status) -> String {
    format!("{PROTOCOL_VERSION} {status}\n")
}
