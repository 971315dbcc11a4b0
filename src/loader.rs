//! Playlist loading from HTTP(S) or local files, with retries, gzip support and cancellation

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::m3u_parser::parse_m3u;
use crate::models::ChannelRecord;

/// Where playlist text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSource {
    Url(String),
    File(PathBuf),
}

impl PlaylistSource {
    /// `http://` and `https://` are remote, anything else is a file path
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            PlaylistSource::Url(input.to_string())
        } else {
            PlaylistSource::File(PathBuf::from(input))
        }
    }
}

impl fmt::Display for PlaylistSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistSource::Url(url) => f.write_str(url),
            PlaylistSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Shared flag a UI thread flips to abandon a load in progress
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Download configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum attempts per load
    pub max_retries: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds
    pub read_timeout_secs: u64,
    /// Wait for the response head in seconds; cancellation is not seen before it arrives
    pub response_timeout_secs: u64,
    /// Chunk size for reading (bytes)
    pub chunk_size: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            connect_timeout_secs: 30,
            read_timeout_secs: 120,
            response_timeout_secs: 15,
            chunk_size: 64 * 1024, // 64KB chunks
            user_agent: "EnhancedTV/1.0".to_string(),
        }
    }
}

/// Download progress callback: (downloaded_bytes, total_bytes)
pub type ProgressCallback = Box<dyn Fn(u64, Option<u64>) + Send>;

/// Fetches playlist text and hands it to the parser
pub struct PlaylistLoader {
    config: FetchConfig,
    agent: ureq::Agent,
    progress: Option<ProgressCallback>,
}

impl PlaylistLoader {
    pub fn new(config: FetchConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.read_timeout_secs)))
            .timeout_connect(Some(Duration::from_secs(config.connect_timeout_secs)))
            .timeout_recv_response(Some(Duration::from_secs(config.response_timeout_secs)))
            .build()
            .new_agent();
        Self {
            config,
            agent,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetch and parse. Errors leave it to the caller to keep its previous channel list.
    pub fn load(
        &self,
        source: &PlaylistSource,
        cancel: &CancelToken,
    ) -> Result<Vec<ChannelRecord>, FetchError> {
        let started = Instant::now();
        info!(%source, "Loading playlist");

        let text = self.fetch_text(source, cancel)?;
        let channels = parse_m3u(&text);

        info!(
            %source,
            channels = channels.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Playlist loaded"
        );
        Ok(channels)
    }

    /// Raw playlist text, decompressed and decoded
    pub fn fetch_text(
        &self,
        source: &PlaylistSource,
        cancel: &CancelToken,
    ) -> Result<String, FetchError> {
        cancel.check()?;
        let bytes = match source {
            PlaylistSource::Url(url) => self.download(url, cancel)?,
            PlaylistSource::File(path) => std::fs::read(path)?,
        };
        cancel.check()?;
        decode_playlist(&bytes)
    }

    /// Download with retry support
    fn download(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>, FetchError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.try_download(url, cancel) {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() || attempts >= max_attempts => return Err(e),
                Err(e) => {
                    warn!(url, attempt = attempts, error = %e, "Playlist download failed, retrying");
                    wait_or_cancel(Duration::from_millis(self.config.retry_delay_ms), cancel)?;
                }
            }
        }
    }

    fn try_download(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>, FetchError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .call()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let total_size: Option<u64> = response
            .headers()
            .get("Content-Length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        let mut reader = response.into_body().into_reader();
        let mut buffer = vec![0u8; self.config.chunk_size.max(1)];
        let mut body = Vec::with_capacity(total_size.unwrap_or(0).min(64 * 1024 * 1024) as usize);

        loop {
            cancel.check()?;
            match reader.read(&mut buffer) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    body.extend_from_slice(&buffer[..n]);
                    if let Some(ref cb) = self.progress {
                        cb(body.len() as u64, total_size);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FetchError::Io(e)),
            }
        }

        debug!(url, bytes = body.len(), "Playlist downloaded");
        Ok(body)
    }
}

/// Sleep in short slices so a cancel request is honoured promptly
fn wait_or_cancel(delay: Duration, cancel: &CancelToken) -> Result<(), FetchError> {
    let slice = Duration::from_millis(50);
    let deadline = Instant::now() + delay;
    while Instant::now() < deadline {
        cancel.check()?;
        std::thread::sleep(slice.min(deadline.saturating_duration_since(Instant::now())));
    }
    cancel.check()
}

/// Bytes to text: gzip is detected by its magic number, a UTF-8 BOM is dropped and
/// invalid sequences are replaced rather than rejected
pub fn decode_playlist(bytes: &[u8]) -> Result<String, FetchError> {
    let text = if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut inflated = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut inflated)?;
        String::from_utf8_lossy(&inflated).into_owned()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::atomic::AtomicU64;
    use std::thread;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    const PLAYLIST: &str = "#EXTM3U\n#EXTINF:-1 tvg-country=\"US\",CNN\nhttp://x/cnn.m3u8\n";

    /// One-shot HTTP server on loopback; returns the base URL
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}/playlist.m3u", addr)
    }

    fn quick_config() -> FetchConfig {
        FetchConfig {
            max_retries: 1,
            retry_delay_ms: 10,
            connect_timeout_secs: 5,
            read_timeout_secs: 5,
            response_timeout_secs: 5,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            PlaylistSource::parse(" https://iptv-org.github.io/iptv/index.m3u "),
            PlaylistSource::Url("https://iptv-org.github.io/iptv/index.m3u".to_string())
        );
        assert_eq!(
            PlaylistSource::parse("HTTP://example.com/a.m3u"),
            PlaylistSource::Url("HTTP://example.com/a.m3u".to_string())
        );
        assert_eq!(
            PlaylistSource::parse("/home/me/tv.m3u"),
            PlaylistSource::File(PathBuf::from("/home/me/tv.m3u"))
        );
    }

    #[test]
    fn test_decode_plain_bom_and_gzip() {
        assert_eq!(decode_playlist(PLAYLIST.as_bytes()).unwrap(), PLAYLIST);

        let with_bom = format!("\u{feff}{}", PLAYLIST);
        assert_eq!(decode_playlist(with_bom.as_bytes()).unwrap(), PLAYLIST);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(PLAYLIST.as_bytes()).unwrap();
        let gz = encoder.finish().unwrap();
        assert_eq!(decode_playlist(&gz).unwrap(), PLAYLIST);

        assert_eq!(decode_playlist(b"caf\xe9").unwrap(), "caf\u{fffd}");
    }

    #[test]
    fn test_truncated_gzip_is_an_error() {
        assert!(matches!(decode_playlist(&[0x1f, 0x8b, 0x08]), Err(FetchError::Io(_))));
    }

    #[test]
    fn test_load_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PLAYLIST.as_bytes()).unwrap();

        let loader = PlaylistLoader::new(quick_config());
        let source = PlaylistSource::File(file.path().to_path_buf());
        let channels = loader.load(&source, &CancelToken::new()).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].title(), "CNN");
        assert_eq!(channels[0].country_code(), "US");
    }

    #[test]
    fn test_missing_file_is_not_retried() {
        let loader = PlaylistLoader::new(quick_config());
        let source = PlaylistSource::File(PathBuf::from("/definitely/not/here.m3u"));
        match loader.load(&source, &CancelToken::new()) {
            Err(FetchError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected NotFound, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let loader = PlaylistLoader::new(quick_config());
        let source = PlaylistSource::Url("http://127.0.0.1:9/never".to_string());
        assert!(matches!(loader.load(&source, &cancel), Err(FetchError::Cancelled)));
    }

    #[test]
    fn test_http_download_with_progress() {
        let url = serve_once("200 OK", PLAYLIST);
        let seen = Arc::new(AtomicU64::new(0));
        let seen_cb = Arc::clone(&seen);

        let loader = PlaylistLoader::new(quick_config()).with_progress(Box::new(
            move |done, total| {
                assert_eq!(total, Some(PLAYLIST.len() as u64));
                seen_cb.store(done, Ordering::SeqCst);
            },
        ));
        let channels = loader.load(&PlaylistSource::Url(url), &CancelToken::new()).unwrap();

        assert_eq!(channels.len(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), PLAYLIST.len() as u64);
    }

    #[test]
    fn test_http_error_status() {
        let url = serve_once("404 Not Found", "gone");
        let loader = PlaylistLoader::new(quick_config());
        let err = loader.load(&PlaylistSource::Url(url), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_silent_server_times_out_before_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/playlist.m3u", listener.local_addr().unwrap());
        thread::spawn(move || {
            // Accept and never answer
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_secs(10));
                drop(stream);
            }
        });

        let config = FetchConfig {
            read_timeout_secs: 30,
            response_timeout_secs: 1,
            ..quick_config()
        };
        let started = Instant::now();
        let err = PlaylistLoader::new(config)
            .load(&PlaylistSource::Url(url), &CancelToken::new())
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_or_cancel_stops_early() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let started = Instant::now();
        assert!(matches!(
            wait_or_cancel(Duration::from_secs(5), &cancel),
            Err(FetchError::Cancelled)
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
