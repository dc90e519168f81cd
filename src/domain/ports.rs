use crate::core::fare::FareRates;
use crate::core::ingestion::GroupingMode;
use crate::domain::model::{DeliveryGroup, DispatchReport, FareEstimate, IngestReport, LoadReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn worker_count(&self) -> usize;
    fn input_buffer(&self) -> usize;
    fn output_buffer(&self) -> usize;
    fn grouping(&self) -> GroupingMode;
    fn max_speed_kmh(&self) -> f64;
    fn rates(&self) -> &FareRates;
    fn utc_offset_minutes(&self) -> i32;
}

/// Delivery groups flowing out of extraction. `completion` resolves once
/// the source is exhausted or the receiving side hung up.
pub struct DeliveryFeed {
    pub groups: mpsc::Receiver<DeliveryGroup>,
    pub completion: JoinHandle<Result<IngestReport>>,
}

/// Fare estimates flowing out of the worker pool. The channel closes only
/// after every worker returned; `completion` is the join barrier.
pub struct FareStream {
    pub estimates: mpsc::Receiver<FareEstimate>,
    pub completion: JoinHandle<DispatchReport>,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<DeliveryFeed>;
    async fn transform(&self, groups: mpsc::Receiver<DeliveryGroup>) -> Result<FareStream>;
    async fn load(&self, estimates: mpsc::Receiver<FareEstimate>) -> Result<LoadReport>;
}
