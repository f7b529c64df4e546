use std::fmt;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::time::Instant;

use crate::playback::PlaybackError;

/// Shell that execs the player inside the child.
const LAUNCHER: &str = "/bin/sh";
/// `$0` is the player name (for `ps`), `$@` the full player argv.
const LAUNCH_SCRIPT: &str = "exec \"$@\"";

const GROUP_POLL: Duration = Duration::from_millis(20);

/// Termination stages, tried in order against the player's process group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Escalation {
    Interrupt,
    Terminate,
    Kill,
}

impl Escalation {
    pub const ORDER: [Escalation; 3] = [
        Escalation::Interrupt,
        Escalation::Terminate,
        Escalation::Kill,
    ];

    pub fn signal(self) -> libc::c_int {
        match self {
            Escalation::Interrupt => libc::SIGINT,
            Escalation::Terminate => libc::SIGTERM,
            Escalation::Kill => libc::SIGKILL,
        }
    }
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Escalation::Interrupt => "SIGINT",
            Escalation::Terminate => "SIGTERM",
            Escalation::Kill => "SIGKILL",
        })
    }
}

/// One running player: the child, the write end of its stdin pipe, and the
/// id of the process group it leads.
#[derive(Debug)]
pub struct PlayerProcess {
    child: Child,
    control: Option<ChildStdin>,
    pid: u32,
}

impl PlayerProcess {
    /// Start `argv` in a new process group with a pipe on its stdin.
    ///
    /// The player is exec'd by a `/bin/sh` launcher inside the child, so a
    /// missing or unexecutable player is not an error here: it shows up later
    /// as the child's own exit status (127 or 126). Only pipe and process
    /// creation failures are reported to the caller.
    pub fn spawn(argv: &[String]) -> Result<Self, PlaybackError> {
        let (program, _) = argv.split_first().ok_or(PlaybackError::EmptyCommand)?;

        let mut command = std::process::Command::new(LAUNCHER);
        command
            .arg("-c")
            .arg(LAUNCH_SCRIPT)
            .arg(program)
            .args(argv)
            .stdin(Stdio::piped())
            .process_group(0);

        let mut child = Command::from(command)
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                program: program.clone(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| PlaybackError::Spawn {
            program: program.clone(),
            source: io::Error::new(io::ErrorKind::Other, "child exited before its pid was read"),
        })?;
        let control = child.stdin.take();

        Ok(Self {
            child,
            control,
            pid,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn has_control(&self) -> bool {
        self.control.is_some()
    }

    pub async fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), PlaybackError> {
        let control = self
            .control
            .as_mut()
            .ok_or(PlaybackError::NoControlChannel)?;
        control
            .write_all(bytes)
            .await
            .map_err(PlaybackError::Control)?;
        control.flush().await.map_err(PlaybackError::Control)
    }

    /// Drop the write end of the control pipe; the player sees EOF on stdin.
    pub fn close_control(&mut self) {
        self.control = None;
    }

    /// Non-blocking check for a finished child.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, PlaybackError> {
        self.child.try_wait().map_err(PlaybackError::Wait)
    }

    /// Signal the whole process group with increasing force.
    ///
    /// The group is signalled even when its leader has already exited, so
    /// helpers the player left behind are stopped too. A stage is skipped
    /// when the OS refuses to deliver its signal. When delivery is accepted
    /// the group gets `grace` to empty before the next stage; after SIGKILL
    /// the wait for the leader is unbounded. Returns the stage that ended the
    /// group, or `None` if nothing was left to signal.
    pub async fn terminate(&mut self, grace: Duration) -> Result<Option<Escalation>, PlaybackError> {
        // Reap a dead leader first so its zombie does not count as a member.
        self.try_wait()?;

        let mut accepted = None;
        let mut last_error = None;

        for stage in Escalation::ORDER {
            match self.deliver(stage.signal()) {
                Ok(()) => accepted = Some(stage),
                Err(e) if e.raw_os_error() == Some(libc::ESRCH) => {
                    // Nothing left to signal.
                    self.wait().await?;
                    return Ok(accepted);
                }
                Err(e) => {
                    tracing::debug!("Process group {} refused {}: {}", self.pid, stage, e);
                    last_error = Some(e);
                    continue;
                }
            }

            if stage == Escalation::Kill {
                self.wait().await?;
                if !self.wait_group(grace).await? {
                    tracing::warn!("Process group {} not empty after {}", self.pid, stage);
                }
                return Ok(Some(stage));
            }
            if self.wait_group(grace).await? {
                return Ok(Some(stage));
            }
            tracing::warn!(
                "Process group {} still running {:?} after {}",
                self.pid,
                grace,
                stage
            );
        }

        // Every signal was refused. The leader may still have exited on its
        // own, so check before giving up.
        if self.try_wait()?.is_some() {
            return Ok(accepted);
        }
        Err(PlaybackError::Signal {
            pid: self.pid,
            source: last_error.unwrap_or_else(|| io::Error::from_raw_os_error(libc::ESRCH)),
        })
    }

    /// Send `signal` to the group, or to the leader alone if it has left it.
    fn deliver(&mut self, signal: libc::c_int) -> io::Result<()> {
        let pid = self.pid_t()?;
        match send_signal(-pid, signal) {
            Err(e) if e.raw_os_error() == Some(libc::ESRCH) => {
                if self.child.try_wait()?.is_some() {
                    return Err(e);
                }
                send_signal(pid, signal)
            }
            result => result,
        }
    }

    /// Poll until the leader is reaped and no member of its group is left.
    async fn wait_group(&mut self, limit: Duration) -> Result<bool, PlaybackError> {
        let deadline = Instant::now() + limit;
        loop {
            if self.try_wait()?.is_some() && !self.group_exists() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(GROUP_POLL).await;
        }
    }

    fn group_exists(&self) -> bool {
        match self.pid_t().and_then(|pid| send_signal(-pid, 0)) {
            Ok(()) => true,
            Err(e) => e.raw_os_error() != Some(libc::ESRCH),
        }
    }

    fn pid_t(&self) -> io::Result<libc::pid_t> {
        libc::pid_t::try_from(self.pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))
    }

    /// Block until the child is reaped.
    pub async fn wait(&mut self) -> Result<ExitStatus, PlaybackError> {
        self.child.wait().await.map_err(PlaybackError::Wait)
    }
}

/// `kill(2)`. A negative `target` addresses a process group.
fn send_signal(target: libc::pid_t, signal: libc::c_int) -> io::Result<()> {
    // SAFETY: kill(2) takes plain integers and touches no memory we own.
    let rc = unsafe { libc::kill(target, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
