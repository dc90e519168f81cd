pub mod dispatcher;
pub mod etl;
pub mod fare;
pub mod filter;
pub mod geo;
pub mod ingestion;
pub mod output;
pub mod pipeline;
pub mod segment;

pub use crate::domain::model::{DeliveryGroup, DeliveryPoint, FareEstimate, Segment};
pub use crate::domain::ports::{ConfigProvider, DeliveryFeed, FareStream, Pipeline, Storage};
pub use crate::utils::error::Result;
