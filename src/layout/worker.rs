use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use eframe::egui::Vec2;
use log::warn;

use super::{LayoutBounds, LayoutConfig, LayoutInput, LayoutKind, compute_layout};

struct LayoutRequest {
    generation: u64,
    kind: LayoutKind,
    input: LayoutInput,
    bounds: LayoutBounds,
    config: LayoutConfig,
}

pub struct LayoutResult {
    pub generation: u64,
    pub kind: LayoutKind,
    pub positions: Vec<Vec2>,
}

/// Persistent background solver. Requests are tagged with a monotonically
/// increasing generation; queued requests are coalesced so a superseded
/// layout is never computed, and `poll` discards results that arrive behind
/// the latest request.
pub struct LayoutWorker {
    request_tx: Sender<LayoutRequest>,
    result_rx: Receiver<LayoutResult>,
    latest_generation: u64,
    last_completed: u64,
}

impl LayoutWorker {
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<LayoutRequest>();
        let (result_tx, result_rx) = mpsc::channel();

        thread::spawn(move || {
            while let Ok(mut request) = request_rx.recv() {
                while let Ok(newer) = request_rx.try_recv() {
                    request = newer;
                }

                let positions =
                    compute_layout(request.kind, &request.input, request.bounds, &request.config);
                let result = LayoutResult {
                    generation: request.generation,
                    kind: request.kind,
                    positions,
                };
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self {
            request_tx,
            result_rx,
            latest_generation: 0,
            last_completed: 0,
        }
    }

    pub fn request(
        &mut self,
        kind: LayoutKind,
        input: LayoutInput,
        bounds: LayoutBounds,
        config: LayoutConfig,
    ) -> u64 {
        self.latest_generation += 1;
        let generation = self.latest_generation;

        let request = LayoutRequest {
            generation,
            kind,
            input,
            bounds,
            config,
        };
        if self.request_tx.send(request).is_err() {
            warn!("layout worker thread is gone; request {generation} dropped");
        }

        generation
    }

    /// Drains completed layouts and returns the one matching the latest
    /// request, if it has arrived. Results behind the latest request are
    /// discarded unseen.
    pub fn poll(&mut self) -> Option<LayoutResult> {
        let mut latest = None;
        loop {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    if result.generation == self.latest_generation {
                        self.last_completed = result.generation;
                        latest = Some(result);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// True while a requested layout has not completed yet.
    pub fn is_busy(&self) -> bool {
        self.last_completed < self.latest_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn small_input() -> LayoutInput {
        LayoutInput {
            ids: vec!["a".into(), "b".into(), "c".into()],
            edges: vec![(0, 1), (0, 2)],
            positions: vec![Vec2::ZERO; 3],
            pins: vec![None; 3],
        }
    }

    #[test]
    fn the_latest_request_wins() {
        let mut worker = LayoutWorker::spawn();
        let bounds = LayoutBounds::default();
        let config = LayoutConfig::default();

        worker.request(LayoutKind::Force, small_input(), bounds, config);
        let second = worker.request(LayoutKind::Tree, small_input(), bounds, config);
        assert!(worker.is_busy());

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            if let Some(result) = worker.poll() {
                break result;
            }
            assert!(Instant::now() < deadline, "worker never delivered a result");
            thread::sleep(Duration::from_millis(5));
        };

        assert_eq!(result.generation, second);
        assert_eq!(result.kind, LayoutKind::Tree);
        assert_eq!(result.positions.len(), 3);
        assert!(!worker.is_busy());
    }

    #[test]
    fn stale_results_are_discarded() {
        // Hand-built worker: no thread, results injected directly.
        let (request_tx, _request_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let mut worker = LayoutWorker {
            request_tx,
            result_rx,
            latest_generation: 3,
            last_completed: 0,
        };

        result_tx
            .send(LayoutResult {
                generation: 2,
                kind: LayoutKind::Force,
                positions: Vec::new(),
            })
            .expect("receiver alive");
        assert!(worker.poll().is_none(), "a result behind the latest request is dropped");
        assert!(worker.is_busy(), "the latest request is still outstanding");

        result_tx
            .send(LayoutResult {
                generation: 3,
                kind: LayoutKind::Force,
                positions: Vec::new(),
            })
            .expect("receiver alive");
        let result = worker.poll().expect("current result is delivered");
        assert_eq!(result.generation, 3);
        assert!(!worker.is_busy());
    }
}
