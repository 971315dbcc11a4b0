//! External media player launching. Decoding and rendering stay in the player process.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::thread;

use tracing::{debug, info, warn};

use crate::models::ChannelRecord;

/// Arguments for `player` to open `channel`. mpv, vlc and ffplay get a window title, the
/// remembered volume where supported and the HTTP user agent; other players get the URL only.
pub fn command_args(
    player: &str,
    channel: &ChannelRecord,
    volume: u8,
    user_agent: Option<&str>,
) -> Vec<String> {
    let player_lower = player.to_lowercase();
    let url = channel.url().to_string();
    let title = channel.title();

    if player_lower.contains("mpv") {
        let mut args = vec![
            url,
            format!("--title={}", title),
            format!("--volume={}", volume),
            "--force-window=immediate".to_string(),
            "--keep-open=no".to_string(),
        ];
        if let Some(ua) = user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        args
    } else if player_lower.contains("vlc") {
        let mut args = vec![
            url,
            format!("--meta-title={}", title),
            "--no-video-title-show".to_string(),
        ];
        if let Some(ua) = user_agent {
            args.push(format!("--http-user-agent={}", ua));
        }
        args
    } else if player_lower.contains("ffplay") {
        // ffplay takes input directly, not with -i flag
        let mut args = vec![
            url,
            "-autoexit".to_string(),
            "-window_title".to_string(),
            title.to_string(),
            "-volume".to_string(),
            volume.to_string(),
        ];
        if let Some(ua) = user_agent {
            args.extend(["-user_agent".to_string(), ua.to_string()]);
        }
        args
    } else {
        vec![url]
    }
}

/// At most one running player; starting a new stream replaces the old process
#[derive(Debug, Default)]
pub struct ExternalPlayer {
    current: Option<Child>,
}

impl ExternalPlayer {
    /// Spawn `player` with `args`, stopping any previous instance. Returns the PID.
    pub fn play(&mut self, player: &str, args: &[String]) -> std::io::Result<u32> {
        self.stop();

        let mut child = Command::new(player)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null()) // Ignore stdout
            .stderr(Stdio::piped())
            .spawn()?;

        let pid = child.id();
        info!(player, pid, "Player launched");

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        debug!(target: "enhanced_tv::player", pid, "{}", line);
                    }
                }
            });
        }

        self.current = Some(child);
        Ok(pid)
    }

    /// Whether the last launched player is still alive
    pub fn is_running(&mut self) -> bool {
        match self.current.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!(?status, "Player exited");
                self.current = None;
                false
            }
            Some(Err(e)) => {
                warn!(error = %e, "Failed to poll player");
                false
            }
            None => false,
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "Player already gone");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
