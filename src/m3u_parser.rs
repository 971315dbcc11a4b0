//! M3U playlist parser: pairs each `#EXTINF:` line with the stream URL that follows it

use tracing::debug;

use crate::extinf::{parse_extinf, EXTINF_MARKER};
use crate::models::ChannelRecord;

/// Parse M3U content into channel records, in playlist order.
///
/// A metadata line stays pending until the next non-comment line, which becomes its URL.
/// A second metadata line replaces an unconsumed one, so orphaned entries are dropped.
/// URL lines with no pending metadata are ignored.
pub fn parse_m3u(content: &str) -> Vec<ChannelRecord> {
    let mut channels = Vec::new();
    let mut pending: Option<&str> = None;
    let mut orphaned = 0usize;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with(EXTINF_MARKER) {
            if pending.replace(line).is_some() {
                orphaned += 1;
            }
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(extinf) = pending.take() {
                channels.push(parse_extinf(extinf).into_record(line.to_string()));
            }
        }
    }

    if pending.is_some() {
        orphaned += 1;
    }
    debug!(channels = channels.len(), orphaned, "Parsed M3U playlist");

    channels
}

#[cfg(test)]
#[path = "m3u_parser_tests.rs"]
mod tests;
