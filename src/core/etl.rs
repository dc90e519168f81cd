use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use crate::utils::monitor::ProcessMonitor;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: ProcessMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ProcessMonitor::new(monitor_enabled),
        }
    }

    /// Runs the three stages concurrently: extraction feeds the worker pool
    /// while the loader drains it. Returns once both completion barriers
    /// resolved.
    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!("Starting fare estimation");
        self.monitor.log_phase("Start");

        let feed = self.pipeline.extract().await?;
        let stream = self.pipeline.transform(feed.groups).await?;
        tracing::info!("Calculating fares...");

        let load = self.pipeline.load(stream.estimates).await;
        let dispatch = stream.completion.await?;
        let ingest = feed.completion.await??;
        let load = load?;
        self.monitor.log_phase("Load");

        tracing::info!(
            records = ingest.records,
            malformed = ingest.malformed,
            deliveries = ingest.groups,
            "Ingestion summary"
        );
        if ingest.split_groups > 0 {
            tracing::warn!(
                split_groups = ingest.split_groups,
                "Some deliveries were split across groups and priced more than once"
            );
        }
        if dispatch.failed > 0 || dispatch.crashed_workers > 0 {
            tracing::warn!(
                failed = dispatch.failed,
                crashed_workers = dispatch.crashed_workers,
                "Some deliveries could not be priced"
            );
        }
        if dispatch.interrupted {
            tracing::warn!(
                "Run was interrupted; {} holds only the deliveries priced before shutdown",
                load.output_path
            );
        }
        tracing::info!("Wrote {} estimates to {}", load.written, load.output_path);
        self.monitor.log_final();

        Ok(RunSummary {
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            interrupted: dispatch.interrupted,
            ingest,
            dispatch,
            load,
        })
    }
}

/// Writes the run summary as pretty JSON.
pub async fn export_summary(summary: &RunSummary, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path.as_ref(), json).await?;
    tracing::info!("📊 Run metrics exported to: {}", path.as_ref().display());
    Ok(())
}
