//! Playback supervision: at most one player process for the whole server.

pub mod command;
pub mod notify;
pub mod process;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::media::item::{MediaItem, MediaType};
use crate::playback::command::{expand, PlayerCommands};
use crate::playback::notify::ChildExitFlag;
use crate::playback::process::PlayerProcess;
use crate::protocol::Status;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("an item is already playing")]
    AlreadyPlaying,
    #[error("file does not exist: {0}")]
    FileMissing(PathBuf),
    #[error("no player configured for {0}")]
    NoPlayer(MediaType),
    #[error("player command is empty")]
    EmptyCommand,
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("no active control channel")]
    NoControlChannel,
    #[error("failed to write to player: {0}")]
    Control(#[source] io::Error),
    #[error("process {pid} could not be signalled: {source}")]
    Signal { pid: u32, source: io::Error },
    #[error("failed to reap player: {0}")]
    Wait(#[source] io::Error),
}

impl PlaybackError {
    /// What the client is told. Everything but the two precondition failures
    /// collapses into an opaque server error.
    pub fn status(&self) -> Status {
        match self {
            PlaybackError::AlreadyPlaying => Status::ItemPlaying,
            PlaybackError::FileMissing(_) => Status::NotFound,
            _ => Status::ServerError,
        }
    }
}

/// The active player and the item it was started for.
#[derive(Debug)]
pub struct PlaybackSession {
    process: PlayerProcess,
    item: MediaItem,
}

impl PlaybackSession {
    pub fn item(&self) -> &MediaItem {
        &self.item
    }

    pub fn pid(&self) -> u32 {
        self.process.pid()
    }
}

/// Owns the single playback session.
#[derive(Debug)]
pub struct Supervisor {
    commands: PlayerCommands,
    grace: Duration,
    exit_flag: ChildExitFlag,
    session: Option<PlaybackSession>,
}

impl Supervisor {
    pub fn new(commands: PlayerCommands, grace: Duration, exit_flag: ChildExitFlag) -> Self {
        Self {
            commands,
            grace,
            exit_flag,
            session: None,
        }
    }

    pub fn exit_flag(&self) -> &ChildExitFlag {
        &self.exit_flag
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// Start a player for `item`.
    ///
    /// The existence check is best effort: the file may still disappear
    /// before the player opens it.
    pub fn play(&mut self, item: &MediaItem) -> Result<(), PlaybackError> {
        if self.session.is_some() {
            return Err(PlaybackError::AlreadyPlaying);
        }
        if !item.path().exists() {
            return Err(PlaybackError::FileMissing(item.path().to_owned()));
        }

        let template = self
            .commands
            .template_for(item.media_type)
            .ok_or(PlaybackError::NoPlayer(item.media_type))?;
        let argv = expand(template, item.filepath());

        let process = PlayerProcess::spawn(&argv)?;
        tracing::info!("Playing {} with pid {}", item.filepath(), process.pid());

        self.session = Some(PlaybackSession {
            process,
            item: item.clone(),
        });
        Ok(())
    }

    /// Forward one byte to the player's stdin.
    pub async fn send_control(&mut self, byte: u8) -> Result<(), PlaybackError> {
        let session = self
            .session
            .as_mut()
            .ok_or(PlaybackError::NoControlChannel)?;
        session.process.send_bytes(&[byte]).await
    }

    /// Stop the player, if any, and wait for it to be reaped.
    ///
    /// If every signal is refused the session is kept (without its control
    /// channel) and the error is returned.
    pub async fn stop(&mut self) -> Result<(), PlaybackError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        session.process.close_control();
        let pid = session.process.pid();

        match session.process.terminate(self.grace).await {
            Ok(Some(stage)) => tracing::info!("Process {} killed by {}", pid, stage),
            Ok(None) => tracing::info!("Process {} had already exited", pid),
            Err(e) => {
                tracing::error!("Process {} could not be killed: {}", pid, e);
                self.session = Some(session);
                return Err(e);
            }
        }

        self.exit_flag.clear();
        Ok(())
    }

    /// Reap the player if it has exited on its own.
    ///
    /// Called after a child-exit notification. A notification that turns out
    /// to be stale (the current player is still running) leaves the session
    /// untouched. Returns whether a session was cleared.
    pub async fn reap_exited(&mut self) -> Result<bool, PlaybackError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        let Some(status) = session.process.try_wait()? else {
            tracing::debug!("Child exit notification while pid {} still runs", session.pid());
            return Ok(false);
        };

        tracing::info!("Process {} exited: {}", session.pid(), status);
        self.stop().await?;
        Ok(true)
    }
}
