//! Minimal M3U/M3U8 playlist parsing

use reqwest::Url;

use super::MemberRef;

/// Stable identifier for a media URL
pub(crate) fn source_id_for(url: &Url) -> String {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, url.as_str().as_bytes()).to_string()
}

/// File stem of the last path segment, used when no title is available
pub(crate) fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let stem = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    };

    stem.to_string()
}

/// Parse playlist text into ordered members.
///
/// Entries are resolved relative to `base`. `#EXTINF` titles apply to the next
/// entry only; lines that are not valid URLs are dropped.
pub(crate) fn parse(base: &Url, body: &str) -> Vec<MemberRef> {
    let mut members = Vec::new();
    let mut pending_title: Option<String> = None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(info) = line.strip_prefix("#EXTINF:") {
            pending_title = info
                .split_once(',')
                .map(|(_, title)| title.trim().to_string())
                .filter(|title| !title.is_empty());
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let Ok(url) = base.join(line) else {
            tracing::debug!(line, "Skipping unparseable playlist entry");
            pending_title = None;
            continue;
        };

        let title = pending_title.take().unwrap_or_else(|| title_from_url(&url));
        members.push(MemberRef {
            source_id: source_id_for(&url),
            title,
            locator: url.to_string(),
        });
    }

    members
}
