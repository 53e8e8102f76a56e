//! Heart attack risk prediction service.
//!
//! Uploaded patient tables go through a fitted preprocessing pipeline and a
//! gradient-boosted tree classifier; predictions come back per `id`.

pub mod classifier;
pub mod error;
pub mod frame;
pub mod model;
pub mod pipeline;
pub mod records;
pub mod server;

pub use error::{Result, ServiceError};
pub use model::{Model, ModelState};
pub use records::PredictionRecord;
