use crate::errors::{AppError, AppResult};
use crate::models::SourceTrack;
use uuid::Uuid;

/// One track per non-blank line. Lines become titles verbatim (trimmed);
/// there is no artist split, the whole line is the search query.
pub fn parse_text_playlist(raw: &str) -> AppResult<Vec<SourceTrack>> {
    let tracks: Vec<SourceTrack> = raw
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| SourceTrack::new(Uuid::new_v4().to_string(), line, None))
        .collect();

    if tracks.is_empty() {
        return Err(AppError::Ingest("Failed to parse your playlist".to_string()));
    }

    log::debug!("Parsed {} tracks from text", tracks.len());
    Ok(tracks)
}
