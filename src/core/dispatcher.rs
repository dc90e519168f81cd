use crate::core::fare::FareCalculator;
use crate::core::filter::PointFilter;
use crate::domain::model::{DeliveryGroup, DispatchReport, FareEstimate};
use crate::domain::ports::FareStream;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_OUTPUT_BUFFER: usize = 1000;

type PriceFn = dyn Fn(DeliveryGroup) -> FareEstimate + Send + Sync;

/// Stop signal shared between the caller and the worker pool. Triggering it
/// also wakes workers parked on the input channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `trigger` was called, immediately if it already was.
    pub async fn triggered(&self) {
        let mut receiver = self.sender.subscribe();
        // the sender is owned by `self`, so the channel cannot close under us
        let _ = receiver.wait_for(|stopped| *stopped).await;
    }
}

/// Fixed-size worker pool: fans delivery groups out to `workers` tasks and
/// fans their estimates back into one bounded channel.
#[derive(Clone)]
pub struct FareDispatcher {
    price: Arc<PriceFn>,
    workers: usize,
    output_buffer: usize,
    shutdown: Shutdown,
}

impl FareDispatcher {
    pub fn new(filter: PointFilter, calculator: FareCalculator) -> Self {
        Self::from_fn(move |group| process_group(&filter, &calculator, group))
    }

    /// Pool around an arbitrary per-delivery computation. A panic inside
    /// `price` costs only the delivery that caused it.
    pub fn from_fn<F>(price: F) -> Self
    where
        F: Fn(DeliveryGroup) -> FareEstimate + Send + Sync + 'static,
    {
        Self {
            price: Arc::new(price),
            workers: DEFAULT_WORKERS,
            output_buffer: DEFAULT_OUTPUT_BUFFER,
            shutdown: Shutdown::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_output_buffer(mut self, output_buffer: usize) -> Self {
        self.output_buffer = output_buffer.max(1);
        self
    }

    /// Once triggered, workers stop pulling new groups, including workers
    /// already waiting for one. A group in flight is still finished and
    /// emitted.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn dispatch(&self, input: mpsc::Receiver<DeliveryGroup>) -> FareStream {
        let (tx, rx) = mpsc::channel(self.output_buffer);
        let input = Arc::new(Mutex::new(input));
        let mut workers = JoinSet::new();

        for worker_id in 0..self.workers {
            let worker = Worker {
                id: worker_id,
                price: self.price.clone(),
                input: input.clone(),
                output: tx.clone(),
                shutdown: self.shutdown.clone(),
            };
            workers.spawn(worker.run());
        }
        // workers hold the only senders left, so the channel closes with the last one
        drop(tx);

        let worker_count = self.workers;
        let completion = tokio::spawn(async move {
            let mut report = DispatchReport::default();
            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok(stats) => {
                        report.processed += stats.processed;
                        report.failed += stats.failed;
                        report.interrupted |= stats.stopped;
                    }
                    Err(e) => {
                        tracing::error!("fare worker terminated abnormally: {}", e);
                        report.crashed_workers += 1;
                    }
                }
            }
            tracing::info!(
                workers = worker_count,
                processed = report.processed,
                failed = report.failed,
                interrupted = report.interrupted,
                "all fare workers finished"
            );
            report
        });

        FareStream {
            estimates: rx,
            completion,
        }
    }
}

/// Filter + fare for one delivery. Pure and synchronous.
pub fn process_group(
    filter: &PointFilter,
    calculator: &FareCalculator,
    group: DeliveryGroup,
) -> FareEstimate {
    let DeliveryGroup {
        delivery_id,
        points,
    } = group;
    let retained = filter.filter(points);
    calculator.estimate(delivery_id, &retained)
}

#[derive(Debug, Default)]
struct WorkerStats {
    processed: u64,
    failed: u64,
    stopped: bool,
}

enum Next {
    Group(DeliveryGroup),
    Exhausted,
    Stopped,
}

struct Worker {
    id: usize,
    price: Arc<PriceFn>,
    input: Arc<Mutex<mpsc::Receiver<DeliveryGroup>>>,
    output: mpsc::Sender<FareEstimate>,
    shutdown: Shutdown,
}

impl Worker {
    async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => Next::Stopped,
                next = self.next_group() => next,
            };
            let group = match next {
                Next::Group(group) => group,
                Next::Exhausted => break,
                Next::Stopped => {
                    tracing::info!(worker = self.id, "shutdown requested, worker stopping");
                    stats.stopped = true;
                    break;
                }
            };
            let delivery_id = group.delivery_id;

            let computed = catch_unwind(AssertUnwindSafe(|| (self.price)(group)));
            let estimate = match computed {
                Ok(estimate) => estimate,
                Err(_) => {
                    tracing::error!(
                        worker = self.id,
                        delivery_id,
                        "fare computation panicked, delivery skipped"
                    );
                    stats.failed += 1;
                    continue;
                }
            };

            tracing::debug!(
                worker = self.id,
                delivery_id,
                fare = estimate.fare,
                "fare computed"
            );
            if self.output.send(estimate).await.is_err() {
                tracing::warn!(
                    worker = self.id,
                    "estimate receiver dropped, worker stopping"
                );
                break;
            }
            stats.processed += 1;
        }

        stats
    }

    /// The lock only guards the wait for the next group, not the work.
    async fn next_group(&self) -> Next {
        let mut input = self.input.lock().await;
        // the stop may have landed while this worker was queued on the lock
        if self.shutdown.is_triggered() {
            return Next::Stopped;
        }
        match input.recv().await {
            Some(group) => Next::Group(group),
            None => Next::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DeliveryPoint;
    use std::time::Duration;

    fn group(id: i64, coords: &[(f64, f64, i64)]) -> DeliveryGroup {
        let points = coords
            .iter()
            .map(|&(lat, lon, t)| DeliveryPoint::from_unix(id, lat, lon, t).unwrap())
            .collect();
        DeliveryGroup::new(id, points)
    }

    async fn run_all(
        dispatcher: &FareDispatcher,
        groups: Vec<DeliveryGroup>,
    ) -> (Vec<FareEstimate>, DispatchReport) {
        let (tx, rx) = mpsc::channel(groups.len().max(1));
        for g in groups {
            tx.send(g).await.unwrap();
        }
        drop(tx);

        let mut stream = dispatcher.dispatch(rx);
        let mut out = Vec::new();
        while let Some(estimate) = stream.estimates.recv().await {
            out.push(estimate);
        }
        let report = stream.completion.await.unwrap();
        out.sort_by_key(|e| e.delivery_id);
        (out, report)
    }

    #[test]
    fn test_process_group_filters_before_pricing() {
        // 2021-01-01 12:00:00 UTC; the middle point implies ~1100 km/min
        let g = group(
            1,
            &[
                (40.7128, -74.0060, 1_609_502_400),
                (50.7128, -84.0060, 1_609_502_460),
                (40.7128, -74.0061, 1_609_504_200),
            ],
        );
        let estimate = process_group(&PointFilter::default(), &FareCalculator::default(), g);
        assert_eq!(estimate.delivery_id, 1);
        assert_eq!(estimate.fare, 7.25);
    }

    #[tokio::test]
    async fn test_every_delivery_emitted_once() {
        let dispatcher = FareDispatcher::new(PointFilter::default(), FareCalculator::default())
            .with_workers(3)
            .with_output_buffer(2);
        let groups: Vec<_> = (1..=20)
            .map(|id| group(id, &[(40.0, -74.0, 0), (40.0, -74.0001, 1800)]))
            .collect();

        let (estimates, report) = run_all(&dispatcher, groups).await;

        let ids: Vec<i64> = estimates.iter().map(|e| e.delivery_id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        assert_eq!(report.processed, 20);
        assert_eq!(report.failed, 0);
        assert_eq!(report.crashed_workers, 0);
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_empty_groups_get_minimum_fare() {
        let dispatcher = FareDispatcher::new(PointFilter::default(), FareCalculator::default());
        let groups = vec![group(4, &[]), group(5, &[(1.0, 1.0, 0)])];
        let (estimates, _) = run_all(&dispatcher, groups).await;
        assert_eq!(
            estimates,
            vec![
                FareEstimate {
                    delivery_id: 4,
                    fare: 3.47,
                },
                FareEstimate {
                    delivery_id: 5,
                    fare: 3.47,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_closes_stream() {
        let dispatcher = FareDispatcher::new(PointFilter::default(), FareCalculator::default());
        let (estimates, report) = run_all(&dispatcher, vec![]).await;
        assert!(estimates.is_empty());
        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn test_panicking_delivery_does_not_affect_others() {
        let dispatcher = FareDispatcher::from_fn(|group: DeliveryGroup| {
            if group.delivery_id == 3 {
                panic!("corrupt delivery");
            }
            FareEstimate {
                delivery_id: group.delivery_id,
                fare: 1.0,
            }
        })
        .with_workers(2);
        let groups = (1..=6).map(|id| group(id, &[])).collect();

        let (estimates, report) = run_all(&dispatcher, groups).await;

        let ids: Vec<i64> = estimates.iter().map(|e| e.delivery_id).collect();
        assert_eq!(ids, vec![1, 2, 4, 5, 6]);
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 5);
        assert_eq!(report.crashed_workers, 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_dispatch_pulls_nothing() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let dispatcher = FareDispatcher::new(PointFilter::default(), FareCalculator::default())
            .with_shutdown(shutdown);

        let groups = vec![group(1, &[]), group(2, &[])];
        let (estimates, report) = run_all(&dispatcher, groups).await;

        assert!(estimates.is_empty());
        assert_eq!(report.processed, 0);
        assert!(report.interrupted);
        assert!(dispatcher.shutdown_handle().is_triggered());
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiting_workers() {
        let dispatcher = FareDispatcher::new(PointFilter::default(), FareCalculator::default())
            .with_workers(3);
        let (tx, rx) = mpsc::channel(16);
        let mut stream = dispatcher.dispatch(rx);

        // let every worker park on the empty input
        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.shutdown_handle().trigger();
        for id in 1..=10 {
            if tx.send(group(id, &[])).await.is_err() {
                break;
            }
        }

        let mut priced = 0;
        while stream.estimates.recv().await.is_some() {
            priced += 1;
        }
        let report = stream.completion.await.unwrap();

        assert_eq!(priced, 0);
        assert_eq!(report.processed, 0);
        assert!(report.interrupted);
        drop(tx);
    }

    #[tokio::test]
    async fn test_in_flight_delivery_finishes_after_shutdown() {
        let shutdown = Shutdown::new();
        let stop = shutdown.clone();
        let dispatcher = FareDispatcher::from_fn(move |group: DeliveryGroup| {
            stop.trigger();
            FareEstimate {
                delivery_id: group.delivery_id,
                fare: 2.0,
            }
        })
        .with_workers(1)
        .with_shutdown(shutdown);

        let groups = (1..=5).map(|id| group(id, &[])).collect();
        let (estimates, report) = run_all(&dispatcher, groups).await;

        assert_eq!(
            estimates,
            vec![FareEstimate {
                delivery_id: 1,
                fare: 2.0,
            }]
        );
        assert_eq!(report.processed, 1);
        assert!(report.interrupted);
    }
}
