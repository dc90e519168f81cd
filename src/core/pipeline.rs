use crate::core::dispatcher::{FareDispatcher, Shutdown};
use crate::core::fare::FareCalculator;
use crate::core::filter::PointFilter;
use crate::core::{ingestion, output};
use crate::core::{ConfigProvider, DeliveryFeed, FareStream, Pipeline, Storage};
use crate::domain::model::{DeliveryGroup, FareEstimate, LoadReport};
use crate::utils::error::Result;
use tokio::sync::mpsc;

/// CSV in, fares out: ingestion → worker pool → CSV writer.
pub struct FarePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    dispatcher: FareDispatcher,
}

impl<S: Storage, C: ConfigProvider> FarePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let calculator = FareCalculator::new(config.rates().clone(), config.utc_offset_minutes())?;
        let dispatcher = FareDispatcher::new(PointFilter::new(config.max_speed_kmh()), calculator)
            .with_workers(config.worker_count())
            .with_output_buffer(config.output_buffer());

        Ok(Self {
            storage,
            config,
            dispatcher,
        })
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.dispatcher = self.dispatcher.with_shutdown(shutdown);
        self
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.dispatcher.shutdown_handle()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for FarePipeline<S, C> {
    async fn extract(&self) -> Result<DeliveryFeed> {
        tracing::debug!("Reading telemetry from: {}", self.config.input_path());
        let data = self.storage.read_file(self.config.input_path()).await?;
        tracing::debug!(
            "Read {} bytes, grouping {:?}",
            data.len(),
            self.config.grouping()
        );

        Ok(ingestion::spawn_ingest(
            data,
            self.config.grouping(),
            self.config.input_buffer(),
        ))
    }

    async fn transform(&self, groups: mpsc::Receiver<DeliveryGroup>) -> Result<FareStream> {
        tracing::debug!(
            "Dispatching deliveries to {} workers",
            self.config.worker_count()
        );
        Ok(self.dispatcher.dispatch(groups))
    }

    async fn load(&self, estimates: mpsc::Receiver<FareEstimate>) -> Result<LoadReport> {
        let (data, written) = output::collect_csv(estimates).await?;

        tracing::debug!("Writing {} estimates ({} bytes)", written, data.len());
        self.storage.write_file(self.config.output_path(), &data).await?;

        Ok(LoadReport {
            written,
            output_path: self.config.output_path().to_string(),
        })
    }
}
