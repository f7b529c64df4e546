//! One connection, one request, one response.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::encode::{self, EncodeError};
use crate::protocol::request::{self, item_id, Request, MAX_REQUEST_LEN};
use crate::protocol::{status_line, Status};
use crate::server::{ServerContext, ServerState};

/// Serve a single exchange on `stream`.
///
/// A failed or empty read ends the exchange without writing anything. The
/// stream is shut down afterwards either way.
pub async fn handle<S>(ctx: &mut ServerContext, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; MAX_REQUEST_LEN];
    let len = match stream.read(&mut buf).await {
        Ok(0) => {
            tracing::debug!("Empty request, closing");
            return;
        }
        Ok(len) => len,
        Err(e) => {
            tracing::warn!("Error reading request: {}", e);
            return;
        }
    };

    let response = dispatch(ctx, &buf[..len]).await;

    if let Err(e) = stream.write_all(&response).await {
        tracing::warn!("Error writing response: {}", e);
        return;
    }
    let _ = stream.shutdown().await;
}

/// Parse and execute one request, returning the full response bytes.
pub async fn dispatch(ctx: &mut ServerContext, raw: &[u8]) -> Vec<u8> {
    tracing::debug!("Request {:?} ({} bytes)", String::from_utf8_lossy(raw), raw.len());

    let request = match request::parse(raw) {
        Ok(request) => request,
        Err(status) => return status_only(status),
    };

    match request {
        Request::Ctrl(byte) => status_only(handle_ctrl(ctx, byte).await),
        Request::Info(arg) => match item_id(&arg).and_then(|id| ctx.catalog.lookup(id)) {
            Some(item) => respond(encode::info(item)),
            None => status_only(Status::NotFound),
        },
        Request::List {
            media_type,
            offset,
            length,
        } => respond(encode::listing(&ctx.catalog, media_type, offset, length)),
        Request::Play(arg) => status_only(handle_play(ctx, &arg)),
        Request::Restart(secret) => status_only(authorize(ctx, &secret, ServerState::Restarting)),
        Request::Shutdown(secret) => {
            status_only(authorize(ctx, &secret, ServerState::ShuttingDown))
        }
        Request::Stat => respond(encode::status(&ctx.catalog)),
        Request::Stop => status_only(handle_stop(ctx).await),
    }
}

fn status_only(status: Status) -> Vec<u8> {
    status_line(status).into_bytes()
}

fn respond(encoded: Result<Vec<u8>, EncodeError>) -> Vec<u8> {
    match encoded {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::info!("Request failed: {}", e);
            status_only(e.status())
        }
    }
}

async fn handle_ctrl(ctx: &mut ServerContext, byte: u8) -> Status {
    match ctx.supervisor.send_control(byte).await {
        Ok(()) => Status::Ok,
        Err(e) => {
            tracing::warn!("CTRL failed: {}", e);
            e.status()
        }
    }
}

/// The busy check comes first: while a player runs every PLAY is refused,
/// whatever its argument.
fn handle_play(ctx: &mut ServerContext, arg: &[u8]) -> Status {
    if ctx.supervisor.is_playing() {
        return Status::ItemPlaying;
    }
    let Some(id) = item_id(arg) else {
        return Status::NotFound;
    };
    let Some(item) = ctx.catalog.lookup(id) else {
        return Status::NotFound;
    };
    match ctx.supervisor.play(item) {
        Ok(()) => Status::Ok,
        Err(e) => {
            tracing::error!("PLAY {} failed: {}", id, e);
            e.status()
        }
    }
}

async fn handle_stop(ctx: &mut ServerContext) -> Status {
    match ctx.supervisor.stop().await {
        Ok(()) => Status::Ok,
        Err(e) => e.status(),
    }
}

/// Move to `next` when `secret` is exactly the admin key.
fn authorize(ctx: &mut ServerContext, secret: &[u8], next: ServerState) -> Status {
    if secret != ctx.config.admin_key.as_bytes() {
        tracing::warn!("Rejected {:?} request with wrong admin key", next);
        return Status::Unauthorized;
    }
    ctx.state = next;
    Status::Ok
}
