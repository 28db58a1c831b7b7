use super::models::{ImportFailure, ImportSummary};
use super::MatchingController;
use crate::errors::{AppError, AppResult};
use crate::models::{ChannelTrack, Phase};

impl MatchingController {
    /// Forward every confirmed match to the channel, one request at a time
    /// and in match order. Individual failures are collected, not raised.
    pub async fn import_all(&self, channel_id: &str) -> AppResult<ImportSummary> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| AppError::Import("No import sink configured".to_string()))?;

        let matches = {
            let store = self.store.lock();
            if store.phase() != Phase::Confirmed {
                return Err(AppError::InvalidPhase(format!(
                    "cannot import while {}; confirm matches first",
                    store.phase()
                )));
            }
            store.session().matches().to_vec()
        };

        log::info!(
            "Importing {} tracks to {} channel {}",
            matches.len(),
            sink.id(),
            channel_id
        );

        let total = matches.len();
        let mut summary = ImportSummary::default();
        for (i, m) in matches.into_iter().enumerate() {
            let track = ChannelTrack::from(&m);
            match sink.import_track(channel_id, &track).await {
                Ok(()) => {
                    log::debug!("[{}/{}] Imported {}", i + 1, total, m.title);
                    summary.succeeded += 1;
                }
                Err(e) => {
                    log::warn!("[{}/{}] Failed to import {}: {}", i + 1, total, m.title, e);
                    summary.failed.push(ImportFailure {
                        track: m,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Import finished: {} succeeded, {} failed",
            summary.succeeded,
            summary.failed.len()
        );
        Ok(summary)
    }
}
