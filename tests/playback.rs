use std::path::Path;
use std::time::Duration;

use mediacenter::media::item::{MediaItem, MediaType};
use mediacenter::playback::command::{expand, PlayerCommands};
use mediacenter::playback::notify::ChildExitFlag;
use mediacenter::playback::process::{Escalation, PlayerProcess};
use mediacenter::playback::{PlaybackError, Supervisor};
use mediacenter::protocol::Status;

fn players(audio: &str) -> PlayerCommands {
    PlayerCommands {
        audio: audio.to_string(),
        video: audio.to_string(),
        rom_nes: audio.to_string(),
        fallback: None,
    }
}

fn media_file(dir: &Path, name: &str, media_type: MediaType) -> MediaItem {
    let path = dir.join(name);
    std::fs::write(&path, b"x").unwrap();
    MediaItem::new(1, path.to_str().unwrap().to_string(), media_type)
}

fn supervisor(audio: &str) -> Supervisor {
    Supervisor::new(players(audio), Duration::from_millis(300), ChildExitFlag::new())
}

// ── command templates ────────────────────────────────────────────────────────

#[test]
fn expand_substitutes_path() {
    assert_eq!(
        expand("/usr/bin/omxplayer -b %s", "/media/a b.mp3"),
        vec!["/usr/bin/omxplayer", "-b", "/media/a b.mp3"]
    );
}

#[test]
fn expand_keeps_quoted_arguments_together() {
    assert_eq!(
        expand("/bin/sh -c \"exec sleep 30\" %s", "/m/x.mp3"),
        vec!["/bin/sh", "-c", "exec sleep 30", "/m/x.mp3"]
    );
}

#[test]
fn expand_replaces_placeholder_inside_argument() {
    assert_eq!(
        expand("player --file=%s  --loop", "/m/x.mp3"),
        vec!["player", "--file=/m/x.mp3", "--loop"]
    );
}

#[test]
fn expand_empty_template() {
    assert!(expand("", "/m/x.mp3").is_empty());
    assert!(expand("   ", "/m/x.mp3").is_empty());
}

#[test]
fn templates_by_type() {
    let commands = PlayerCommands::default();
    assert_eq!(commands.template_for(MediaType::Audio), Some("/usr/bin/omxplayer -b %s"));
    assert_eq!(commands.template_for(MediaType::Video), Some("/usr/bin/omxplayer -b %s"));
    assert_eq!(commands.template_for(MediaType::RomNes), Some("/usr/bin/fceu %s"));
    assert_eq!(commands.template_for(MediaType::RomGb), None);

    let with_fallback = PlayerCommands {
        fallback: Some("./handle_unknown_type.sh %s".to_string()),
        ..PlayerCommands::default()
    };
    assert_eq!(
        with_fallback.template_for(MediaType::RomGb),
        Some("./handle_unknown_type.sh %s")
    );
}

// ── supervisor ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn stop_without_session_is_noop() {
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");
    supervisor.stop().await.unwrap();
    supervisor.stop().await.unwrap();
    assert!(!supervisor.is_playing());
}

#[tokio::test]
async fn play_then_stop() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");

    supervisor.play(&item).unwrap();
    assert!(supervisor.is_playing());
    assert_eq!(supervisor.session().unwrap().item(), &item);

    supervisor.stop().await.unwrap();
    assert!(!supervisor.is_playing());

    // the slot is free again
    supervisor.play(&item).unwrap();
    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn second_play_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let first = media_file(dir.path(), "one.mp3", MediaType::Audio);
    let second = media_file(dir.path(), "two.mp3", MediaType::Audio);
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");

    supervisor.play(&first).unwrap();
    let err = supervisor.play(&second).unwrap_err();
    assert!(matches!(err, PlaybackError::AlreadyPlaying));
    assert_eq!(err.status(), Status::ItemPlaying);
    assert_eq!(supervisor.session().unwrap().item(), &first);

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn play_missing_file_is_not_found() {
    let item = MediaItem::new(1, "/nonexistent/song.mp3".to_string(), MediaType::Audio);
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");
    let err = supervisor.play(&item).unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
    assert!(!supervisor.is_playing());
}

#[tokio::test]
async fn play_without_player_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "tetris.gb", MediaType::RomGb);
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");
    let err = supervisor.play(&item).unwrap_err();
    assert!(matches!(err, PlaybackError::NoPlayer(MediaType::RomGb)));
    assert_eq!(err.status(), Status::ServerError);
    assert!(!supervisor.is_playing());
}

#[tokio::test]
async fn play_unlaunchable_binary_exits_in_child() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let mut supervisor = supervisor("/nonexistent/player %s");

    // the launch itself succeeds; the failure is the child's exit status
    supervisor.play(&item).unwrap();
    assert!(supervisor.is_playing());

    let mut reaped = false;
    for _ in 0..50 {
        if supervisor.reap_exited().await.unwrap() {
            reaped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reaped);
    assert!(!supervisor.is_playing());
}

#[tokio::test]
async fn unlaunchable_binary_exit_status() {
    let argv = expand("/nonexistent/player %s", "/m/x.mp3");
    let mut process = PlayerProcess::spawn(&argv).unwrap();
    let status = process.wait().await.unwrap();
    assert_eq!(status.code(), Some(127));
}

#[tokio::test]
async fn control_requires_session() {
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");
    let err = supervisor.send_control(b'p').await.unwrap_err();
    assert!(matches!(err, PlaybackError::NoControlChannel));
    assert_eq!(err.status(), Status::ServerError);
}

#[tokio::test]
async fn control_reaches_player_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let out = dir.path().join("received");
    let template = format!(
        "/bin/sh -c \"head -c 1 > {}; exec sleep 30\" %s",
        out.display()
    );
    let mut supervisor = supervisor(&template);

    supervisor.play(&item).unwrap();
    supervisor.send_control(b'p').await.unwrap();

    let mut received = Vec::new();
    for _ in 0..50 {
        received = std::fs::read(&out).unwrap_or_default();
        if !received.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(received, b"p");

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn reap_exited_clears_finished_player() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let mut supervisor = supervisor("/bin/sh -c \"exit 0\" %s");

    supervisor.play(&item).unwrap();
    let mut reaped = false;
    for _ in 0..50 {
        if supervisor.reap_exited().await.unwrap() {
            reaped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reaped);
    assert!(!supervisor.is_playing());
}

#[tokio::test]
async fn reap_exited_ignores_running_player() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");

    supervisor.play(&item).unwrap();
    assert!(!supervisor.reap_exited().await.unwrap());
    assert!(supervisor.is_playing());
    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn stop_clears_pending_exit_notification() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let mut supervisor = supervisor("/bin/sh -c \"exec sleep 30\" %s");

    supervisor.play(&item).unwrap();
    supervisor.exit_flag().raise();
    supervisor.stop().await.unwrap();
    assert!(!supervisor.exit_flag().take());
}

// ── escalation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn terminate_stops_at_interrupt() {
    let argv = expand("/bin/sh -c \"exec sleep 30\"", "");
    let mut process = PlayerProcess::spawn(&argv).unwrap();
    let stage = process.terminate(Duration::from_secs(5)).await.unwrap();
    assert_eq!(stage, Some(Escalation::Interrupt));
}

#[tokio::test]
async fn terminate_escalates_when_interrupt_is_ignored() {
    let argv = expand("/bin/sh -c \"trap '' INT; sleep 30\"", "");
    let mut process = PlayerProcess::spawn(&argv).unwrap();
    // give the shell time to install its trap
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stage = process.terminate(Duration::from_millis(300)).await.unwrap();
    assert_eq!(stage, Some(Escalation::Terminate));
}

#[tokio::test]
async fn terminate_after_exit_reports_nothing() {
    let argv = expand("/bin/sh -c \"exit 3\"", "");
    let mut process = PlayerProcess::spawn(&argv).unwrap();
    let status = process.wait().await.unwrap();
    assert_eq!(status.code(), Some(3));
    assert_eq!(process.terminate(Duration::from_millis(100)).await.unwrap(), None);
}

/// Whether `pid` names a live (non-zombie) process.
#[cfg(target_os = "linux")]
fn process_running(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    let state = stat.rsplit_once(')').and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn reap_exited_stops_leftover_group_members() {
    let dir = tempfile::tempdir().unwrap();
    let item = media_file(dir.path(), "song.mp3", MediaType::Audio);
    let pid_file = dir.path().join("helper.pid");
    let template = format!(
        "/bin/sh -c \"sleep 30 & echo $! > {}; exit 0\" %s",
        pid_file.display()
    );
    let mut supervisor = supervisor(&template);

    supervisor.play(&item).unwrap();

    let mut helper = None;
    for _ in 0..50 {
        let text = std::fs::read_to_string(&pid_file).unwrap_or_default();
        if let Ok(pid) = text.trim().parse::<u32>() {
            helper = Some(pid);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let helper = helper.expect("helper pid was not written");
    assert!(process_running(helper));

    let mut reaped = false;
    for _ in 0..50 {
        if supervisor.reap_exited().await.unwrap() {
            reaped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reaped);
    assert!(!process_running(helper));
}

#[tokio::test]
async fn terminate_signals_group_after_leader_exit() {
    let argv = expand("/bin/sh -c \"sleep 30 & exit 0\"", "");
    let mut process = PlayerProcess::spawn(&argv).unwrap();
    process.wait().await.unwrap();
    // the background sleep is still in the group, so some stage is needed
    let stage = process.terminate(Duration::from_millis(300)).await.unwrap();
    assert!(stage.is_some());
}

#[test]
fn spawn_empty_command_fails() {
    assert!(matches!(PlayerProcess::spawn(&[]), Err(PlaybackError::EmptyCommand)));
}

#[test]
fn escalation_order_and_names() {
    assert_eq!(
        Escalation::ORDER,
        [Escalation::Interrupt, Escalation::Terminate, Escalation::Kill]
    );
    assert_eq!(Escalation::Kill.to_string(), "SIGKILL");
    assert_eq!(Escalation::Interrupt.signal(), libc::SIGINT);
}
