//! Plain-text renderings of confirmed matches for copy/paste.

use crate::models::Match;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Ids,
    Urls,
}

pub fn render(matches: &[Match], format: ExportFormat) -> String {
    match format {
        ExportFormat::Csv => to_csv(matches),
        ExportFormat::Ids => to_id_list(matches),
        ExportFormat::Urls => to_url_list(matches),
    }
}

/// `title;youtube` header, then one row per match. Semicolons are stripped
/// from titles since they are the column separator.
pub fn to_csv(matches: &[Match]) -> String {
    let mut out = String::from("title;youtube\n");
    for m in matches {
        out.push_str(&m.title.replace(';', ""));
        out.push(';');
        out.push_str(&m.external_video_id);
        out.push('\n');
    }
    out
}

pub fn to_id_list(matches: &[Match]) -> String {
    lines(matches.iter().map(|m| m.external_video_id.as_str()))
}

pub fn to_url_list(matches: &[Match]) -> String {
    lines(matches.iter().map(|m| m.url.as_str()))
}

fn lines<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.fold(String::new(), |mut acc, item| {
        acc.push_str(item);
        acc.push('\n');
        acc
    })
}
