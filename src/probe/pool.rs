//! Bounded worker pool for probing many cameras at once.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Mutex;

use super::{probe_camera, ProbeOptions, ProbeOutcome, ProbeRequest, ProbeTransport};

/// Totals for one probe run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Probe `requests` on up to `workers` threads.
///
/// Outcomes reach `on_result` on the calling thread in completion order, so the
/// caller may mutate its table and cache without locking.
pub fn probe_all<T, F>(
    transport: &T,
    requests: Vec<ProbeRequest>,
    options: ProbeOptions,
    workers: usize,
    mut on_result: F,
) -> ProbeSummary
where
    T: ProbeTransport + ?Sized,
    F: FnMut(ProbeOutcome),
{
    let mut summary = ProbeSummary::default();
    if requests.is_empty() {
        return summary;
    }
    let workers = workers.max(1).min(requests.len());
    let queue = Mutex::new(VecDeque::from(requests));
    let (tx, rx) = mpsc::channel::<ProbeOutcome>();

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            scope.spawn(move || loop {
                let next = match queue.lock() {
                    Ok(mut pending) => pending.pop_front(),
                    Err(_) => {
                        log::error!("probe worker {}: queue lock poisoned", worker);
                        return;
                    }
                };
                let Some(request) = next else {
                    return;
                };
                let outcome = probe_camera(transport, &request, options);
                if tx.send(outcome).is_err() {
                    return;
                }
            });
        }
        drop(tx);

        for outcome in rx {
            if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            on_result(outcome);
        }
    });

    summary
}

#[cfg(test)]
mod tests {
    use super::super::testing::FakeTransport;
    use super::*;
    use crate::camera::{Credentials, PathSetting};

    fn requests(count: u32) -> Vec<ProbeRequest> {
        (1..=count)
            .map(|id| ProbeRequest {
                id,
                ip: format!("10.0.1.{}", id),
                port: 554,
                credentials: Credentials::anonymous(),
                path: PathSetting::Fixed("live".into()),
                known_vendor: "generic".into(),
            })
            .collect()
    }

    #[test]
    fn every_request_reports_once() {
        let transport = FakeTransport::with_ports(&[554])
            .working("rtsp://10.0.1.2:554/live")
            .working("rtsp://10.0.1.5:554/live");

        let mut seen = Vec::new();
        let summary = probe_all(&transport, requests(6), ProbeOptions::default(), 3, |outcome| {
            seen.push((outcome.id, outcome.is_success()));
        });

        seen.sort();
        assert_eq!(
            seen,
            vec![
                (1, false),
                (2, true),
                (3, false),
                (4, false),
                (5, true),
                (6, false)
            ]
        );
        assert_eq!(
            summary,
            ProbeSummary {
                succeeded: 2,
                failed: 4
            }
        );
    }

    #[test]
    fn zero_workers_still_runs() {
        let transport = FakeTransport::with_ports(&[]);
        let summary = probe_all(&transport, requests(2), ProbeOptions::default(), 0, |_| {});
        assert_eq!(summary.failed, 2);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let transport = FakeTransport::default();
        let summary = probe_all(&transport, Vec::new(), ProbeOptions::default(), 4, |_| {
            panic!("no outcomes expected")
        });
        assert_eq!(summary, ProbeSummary::default());
    }
}
