//! Background batch scoring.
//!
//! Scores a batch of feature vectors on a worker thread and streams progress
//! back over a channel so the caller can keep doing other work.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::scoring::ScoringService;
use crate::domain::{FeatureVector, ScoreResponse};

/// Progress updates from the batch worker.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchProgress {
    /// Worker started on `total` rows
    Started { total: usize },
    /// Row `index` scored
    Scored {
        index: usize,
        response: Box<ScoreResponse>,
    },
    /// Row `index` failed
    Failed { index: usize, error: String },
    /// All rows processed
    Complete { scored: usize, failed: usize },
}

/// Handle to a running batch worker.
pub struct BatchWorkerHandle {
    progress_rx: Receiver<BatchProgress>,
    handle: JoinHandle<()>,
}

impl BatchWorkerHandle {
    /// Try to receive the next progress update (non-blocking).
    #[must_use]
    pub fn try_recv(&self) -> Option<BatchProgress> {
        self.progress_rx.try_recv().ok()
    }

    /// Block until the next update; `None` once the worker has finished.
    #[must_use]
    pub fn recv(&self) -> Option<BatchProgress> {
        self.progress_rx.recv().ok()
    }

    /// Drain every remaining update and join the worker thread.
    #[must_use]
    pub fn wait(self) -> Vec<BatchProgress> {
        let updates: Vec<_> = self.progress_rx.iter().collect();
        if self.handle.join().is_err() {
            tracing::error!("Batch worker thread panicked");
        }
        updates
    }
}

/// Worker that scores a batch in the background.
pub struct BatchWorker;

impl BatchWorker {
    /// Spawn a background scoring task.
    pub fn spawn(service: ScoringService, rows: Vec<FeatureVector>) -> BatchWorkerHandle {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || Self::run(&service, rows, &tx));
        BatchWorkerHandle {
            progress_rx: rx,
            handle,
        }
    }

    fn run(service: &ScoringService, rows: Vec<FeatureVector>, tx: &Sender<BatchProgress>) {
        let total = rows.len();
        let _ = tx.send(BatchProgress::Started { total });
        tracing::info!(total, "Batch scoring started");

        let mut failed = 0;
        for (index, row) in rows.iter().enumerate() {
            let update = match service.score_and_explain(row) {
                Ok(response) => BatchProgress::Scored {
                    index,
                    response: Box::new(response),
                },
                Err(e) => {
                    failed += 1;
                    tracing::warn!(index, error = %e, "Batch row failed");
                    BatchProgress::Failed {
                        index,
                        error: e.to_string(),
                    }
                }
            };
            if tx.send(update).is_err() {
                tracing::debug!("Batch receiver dropped, stopping");
                return;
            }
        }

        tracing::info!(total, failed, "Batch scoring complete");
        let _ = tx.send(BatchProgress::Complete {
            scored: total - failed,
            failed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ArtifactDirectory;
    use crate::application::model_store::tests::demo_dir;
    use crate::application::ModelStore;
    use crate::config::EngineConfig;

    fn service() -> ScoringService {
        let source = ArtifactDirectory::open_unverified(demo_dir()).expect("open");
        ScoringService::new(ModelStore::load(&source, &EngineConfig::default()).expect("store"))
    }

    #[test]
    fn test_batch_reports_every_row() {
        let svc = service();
        let rows = vec![
            FeatureVector::new().with("glucose", 12.0).with("age", 60.0),
            FeatureVector::new().with("glucose", 5.0),
            FeatureVector::new(),
        ];
        let expected: Vec<_> = rows
            .iter()
            .map(|r| svc.score_and_explain(r).expect("score"))
            .collect();

        let updates = BatchWorker::spawn(svc, rows).wait();

        assert_eq!(updates.first(), Some(&BatchProgress::Started { total: 3 }));
        assert_eq!(
            updates.last(),
            Some(&BatchProgress::Complete {
                scored: 3,
                failed: 0
            })
        );
        let scored: Vec<_> = updates
            .iter()
            .filter_map(|u| match u {
                BatchProgress::Scored { index, response } => Some((*index, response.as_ref())),
                _ => None,
            })
            .collect();
        assert_eq!(scored.len(), 3);
        for (index, response) in scored {
            assert_eq!(response, &expected[index]);
        }
    }

    #[test]
    fn test_empty_batch() {
        let updates = BatchWorker::spawn(service(), Vec::new()).wait();
        assert_eq!(
            updates,
            vec![
                BatchProgress::Started { total: 0 },
                BatchProgress::Complete {
                    scored: 0,
                    failed: 0
                }
            ]
        );
    }
}
