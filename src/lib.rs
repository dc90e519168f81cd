pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, Settings};

pub use crate::core::{
    dispatcher::{FareDispatcher, Shutdown},
    etl::EtlEngine,
    fare::{FareCalculator, FareRates},
    filter::PointFilter,
    pipeline::FarePipeline,
};
pub use domain::model::{DeliveryGroup, DeliveryPoint, FareEstimate, RunSummary};
pub use utils::error::{FareError, Result};
