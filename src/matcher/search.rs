use super::models::{SearchReport, SearchStrategy};
use super::MatchingController;
use crate::errors::AppError;
use crate::models::CandidateVideo;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::time::Duration;

/// Outcome of a single settled search, before it is applied.
type SearchOutcome = anyhow::Result<Vec<CandidateVideo>>;

impl MatchingController {
    /// Search every track that has not settled yet. Per-track failures are
    /// recorded on the track and never stop the pass.
    pub async fn run_search_pass(&self, strategy: SearchStrategy) -> SearchReport {
        let generation = self.current_generation();
        let pending: Vec<(String, String)> = {
            let store = self.store.lock();
            let session = store.session();
            session
                .pending_ids()
                .into_iter()
                .filter_map(|id| session.track(&id).map(|t| (id, t.search_query())))
                .collect()
        };

        if pending.is_empty() {
            return SearchReport::default();
        }

        log::info!(
            "Searching candidates for {} tracks ({:?})",
            pending.len(),
            strategy
        );

        let report = Mutex::new(SearchReport::default());
        match strategy {
            SearchStrategy::Sequential => {
                self.search_sequential(generation, pending, &report).await
            }
            SearchStrategy::Concurrent => {
                self.search_concurrent(generation, pending, &report).await
            }
        }

        let report = report.into_inner();
        if let Some(ref message) = report.error {
            self.set_last_error(message.clone());
        }
        self.publish();

        log::info!(
            "Search pass done: {} searched, {} with candidates, {} failed, {} discarded",
            report.searched,
            report.found,
            report.failed,
            report.discarded
        );
        report
    }

    async fn search_sequential(
        &self,
        generation: u64,
        pending: Vec<(String, String)>,
        report: &Mutex<SearchReport>,
    ) {
        let limit = self.config.max_search_results;
        let delay = Duration::from_millis(self.config.search_delay_ms);
        let total = pending.len();

        for (i, (source_id, query)) in pending.into_iter().enumerate() {
            if self.current_generation() != generation {
                log::debug!("Session replaced, stopping search pass");
                break;
            }
            // Skipped before its turn: no request needed
            if !self.store.lock().session().contains(&source_id) {
                continue;
            }

            log::debug!("[{}/{}] Searching: {}", i + 1, total, query);
            let outcome = self.search.search_candidates(&query, limit).await;
            self.settle(generation, &source_id, &query, outcome, report);

            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn search_concurrent(
        &self,
        generation: u64,
        pending: Vec<(String, String)>,
        report: &Mutex<SearchReport>,
    ) {
        let limit = self.config.max_search_results;

        // All-settled join: every future resolves to its own outcome
        join_all(pending.into_iter().map(|(source_id, query)| async move {
            let outcome = self.search.search_candidates(&query, limit).await;
            self.settle(generation, &source_id, &query, outcome, report);
        }))
        .await;
    }

    /// Apply one search result, unless its track or session is gone.
    fn settle(
        &self,
        generation: u64,
        source_id: &str,
        query: &str,
        outcome: SearchOutcome,
        report: &Mutex<SearchReport>,
    ) {
        let mut report = report.lock();

        if self.current_generation() != generation {
            log::debug!("Discarding stale result for {}", source_id);
            report.discarded += 1;
            return;
        }

        let (applied, found, failure) = {
            let mut store = self.store.lock();
            match outcome {
                Ok(candidates) => {
                    let found = !candidates.is_empty();
                    (store.set_candidates(source_id, candidates), found, None)
                }
                Err(e) => (store.mark_failed(source_id), false, Some(e.to_string())),
            }
        };

        match applied {
            Ok(true) => {
                // Only results that reach the session count towards "first"
                let first = report.settled == 0;
                report.settled += 1;
                match failure {
                    None => {
                        report.searched += 1;
                        if found {
                            report.found += 1;
                        }
                    }
                    Some(message) => {
                        log::warn!("Search failed for '{}': {}", query, message);
                        report.failed += 1;
                        if first {
                            report.error = Some(AppError::Search(message).to_string());
                        }
                    }
                }
                self.publish();
            }
            Ok(false) => report.discarded += 1,
            Err(e) => log::error!("Could not record search result for {}: {}", source_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::models::{Phase, SearchStatus};
    use crate::session::SessionStore;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failures_never_leave_session_searching() {
        let search = FakeSearch::default().with("Y Song2", &["v2"]);
        let (controller, _, _) = controller(search);

        let report = controller
            .ingest(
                vec![
                    track("a", "X", "Song1"),
                    track("b", "Y", "Song2"),
                    track("c", "Z", "Song3"),
                ],
                SearchStrategy::Sequential,
            )
            .await
            .unwrap();

        assert_eq!(controller.phase(), Phase::Reviewing);
        assert_eq!(report.searched, 1);
        assert_eq!(report.failed, 2);
        // The first search to settle failed
        assert!(report.error.is_some());
        assert!(controller.snapshot().last_error.is_some());

        let view = controller.snapshot();
        assert_eq!(view.tracks[0].status, SearchStatus::Failed);
        assert_eq!(view.tracks[1].candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_later_failure_is_not_session_error() {
        let search = FakeSearch::default().with("X Song1", &["v1"]);
        let (controller, _, _) = controller(search);

        let report = controller
            .ingest(
                vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
                SearchStrategy::Sequential,
            )
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.error, None);
        assert_eq!(controller.phase(), Phase::Reviewing);
    }

    #[tokio::test]
    async fn test_concurrent_pass_settles_all() {
        let search = FakeSearch::default()
            .with("one", &["v1", "v1b", "v1c", "v1d"])
            .with("three", &[]);
        let (controller, search, _) = controller(search);

        let report = controller
            .import_text("one\ntwo\nthree")
            .await
            .unwrap();

        assert_eq!(controller.phase(), Phase::Reviewing);
        assert_eq!(report.searched, 2);
        assert_eq!(report.found, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(search.calls().len(), 3);
        assert_eq!(search.max_in_flight.load(Ordering::SeqCst), 3);

        let view = controller.snapshot();
        let titles: Vec<_> = view.tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
        // Capped at the configured result count, order kept
        let ids: Vec<_> = view.tracks[0].candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v1b", "v1c"]);
        assert_eq!(view.tracks[2].status, SearchStatus::NotFound);
    }

    #[tokio::test]
    async fn test_skip_while_search_in_flight_discards_result() {
        let search = FakeSearch::default()
            .with("X Song1", &["v1"])
            .with("Y Song2", &["v2"])
            .gate("X Song1");
        let (controller, search, _) = controller(search);

        let pass = controller.ingest(
            vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
            SearchStrategy::Sequential,
        );
        let user = async {
            search.started.notified().await;
            assert_eq!(controller.phase(), Phase::Searching);
            assert!(controller.skip("a").unwrap());
            search.release.notify_one();
        };

        let (report, ()) = tokio::join!(pass, user);
        let report = report.unwrap();

        assert_eq!(report.discarded, 1);
        assert_eq!(controller.phase(), Phase::Reviewing);
        let view = controller.snapshot();
        assert_eq!(view.tracks.len(), 1);
        assert_eq!(view.tracks[0].id, "b");

        let matches = controller.confirm().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].external_video_id, "v2");
    }

    #[tokio::test]
    async fn test_skip_before_turn_saves_the_request() {
        let search = FakeSearch::default()
            .with("X Song1", &["v1"])
            .with("Y Song2", &["v2"])
            .gate("X Song1");
        let (controller, search, _) = controller(search);

        let pass = controller.ingest(
            vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
            SearchStrategy::Sequential,
        );
        let user = async {
            search.started.notified().await;
            controller.skip("b").unwrap();
            search.release.notify_one();
        };
        let (report, ()) = tokio::join!(pass, user);

        assert_eq!(report.unwrap().searched, 1);
        assert_eq!(search.calls(), vec!["X Song1"]);
        assert!(controller.snapshot().tracks[0].candidates.len() == 1);
    }

    #[tokio::test]
    async fn test_skip_after_result_removes_candidates() {
        let search = FakeSearch::default()
            .with("X Song1", &["v1"])
            .with("Y Song2", &["v2"]);
        let (controller, _, _) = controller(search);
        controller
            .ingest(
                vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
                SearchStrategy::Sequential,
            )
            .await
            .unwrap();

        controller.skip("a").unwrap();
        let view = controller.snapshot();
        assert!(view.tracks.iter().all(|t| t.id != "a"));
    }

    #[tokio::test]
    async fn test_skip_during_concurrent_pass() {
        let search = FakeSearch::default()
            .with("one", &["v1"])
            .with("two", &["v2"])
            .gate("one");
        let (controller, search, _) = controller(search);

        let pass = controller.import_text("one\ntwo");
        let user = async {
            search.started.notified().await;
            let id = controller.snapshot().tracks[0].id.clone();
            controller.skip(&id).unwrap();
            search.release.notify_one();
        };
        let (report, ()) = tokio::join!(pass, user);

        let report = report.unwrap();
        assert_eq!(report.discarded, 1);
        assert_eq!(report.searched, 1);
        let view = controller.snapshot();
        assert_eq!(view.phase, Phase::Reviewing);
        assert_eq!(view.tracks.len(), 1);
        assert_eq!(view.tracks[0].title, "two");
    }

    #[tokio::test]
    async fn test_failure_for_skipped_track_is_silent() {
        // "X Song1" has no canned result, so its search fails once released
        let search = FakeSearch::default()
            .with("Y Song2", &["v2"])
            .gate("X Song1");
        let (controller, search, _) = controller(search);

        let pass = controller.ingest(
            vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
            SearchStrategy::Sequential,
        );
        let user = async {
            search.started.notified().await;
            controller.skip("a").unwrap();
            search.release.notify_one();
        };
        let (report, ()) = tokio::join!(pass, user);
        let report = report.unwrap();

        assert_eq!(report.discarded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.searched, 1);
        assert_eq!(report.error, None);
        assert_eq!(controller.snapshot().last_error, None);
        assert_eq!(controller.phase(), Phase::Reviewing);
    }

    #[tokio::test]
    async fn test_first_applied_failure_after_skip_is_session_error() {
        let search = FakeSearch::default().gate("X Song1");
        let (controller, search, _) = controller(search);

        let pass = controller.ingest(
            vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
            SearchStrategy::Sequential,
        );
        let user = async {
            search.started.notified().await;
            controller.skip("a").unwrap();
            search.release.notify_one();
        };
        let (report, ()) = tokio::join!(pass, user);
        let report = report.unwrap();

        assert_eq!(report.discarded, 1);
        assert_eq!(report.failed, 1);
        assert!(report.error.as_deref().is_some_and(|e| e.contains("Y Song2")));
        assert!(controller.snapshot().last_error.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_failure_for_skipped_track_is_silent() {
        let search = FakeSearch::default().with("two", &["v2"]).gate("one");
        let (controller, search, _) = controller(search);

        let pass = controller.import_text("one\ntwo");
        let user = async {
            search.started.notified().await;
            let id = controller.snapshot().tracks[0].id.clone();
            controller.skip(&id).unwrap();
            search.release.notify_one();
        };
        let (report, ()) = tokio::join!(pass, user);
        let report = report.unwrap();

        assert_eq!(report.discarded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.error, None);
        assert_eq!(controller.snapshot().last_error, None);
        assert_eq!(controller.snapshot().tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_during_search_ignores_late_results() {
        let search = FakeSearch::default()
            .with("X Song1", &["v1"])
            .gate("X Song1");
        let (controller, search, _) = controller(search);

        let pass = controller.ingest(vec![track("a", "X", "Song1")], SearchStrategy::Sequential);
        let user = async {
            search.started.notified().await;
            controller.clear().unwrap();
            search.release.notify_one();
        };
        let (report, ()) = tokio::join!(pass, user);

        assert_eq!(report.unwrap().discarded, 1);
        assert_eq!(controller.phase(), Phase::Empty);
    }

    #[tokio::test]
    async fn test_resume_searches_only_pending_tracks() {
        let search = FakeSearch::default()
            .with("X Song1", &["v1"])
            .with("Y Song2", &["v2"])
            .gate("Y Song2");
        let (controller, search, storage) = controller(search);

        // Abandon the pass while the second search is in flight
        {
            let pass = controller.ingest(
                vec![track("a", "X", "Song1"), track("b", "Y", "Song2")],
                SearchStrategy::Sequential,
            );
            tokio::select! {
                _ = pass => panic!("pass should still be waiting on the gate"),
                _ = search.started.notified() => {}
            }
        }
        drop(controller);

        let store = SessionStore::open(Box::new(storage), KEY);
        assert_eq!(store.phase(), Phase::Searching);
        let resumed = MatchingController::new(
            store,
            Arc::new(
                FakeSearch::default()
                    .with("X Song1", &["other"])
                    .with("Y Song2", &["v2"]),
            ),
            config(),
        );

        let report = resumed.resume().await;
        assert_eq!(report.searched, 1);
        assert_eq!(resumed.phase(), Phase::Reviewing);
        let view = resumed.snapshot();
        assert_eq!(view.tracks[0].candidates[0].id, "v1");
        assert_eq!(view.tracks[1].candidates[0].id, "v2");
        assert_eq!(search.calls(), vec!["X Song1", "Y Song2"]);
    }
}
