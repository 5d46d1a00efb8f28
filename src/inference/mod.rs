//! Cluster-then-predict inference
//!
//! - [`ClusterRouter`] appends a cluster id to every encoded row
//! - [`ModelDispatcher`] predicts each cluster partition with its specialist
//!   model (sequentially or on the rayon pool)
//! - [`reconcile`] restores the pre-partition row order by row id
//! - [`ResultAggregator`] writes the predictions file
//! - [`PredictionPipeline`] chains preprocessing and the stages above

mod aggregator;
mod config;
mod dispatcher;
mod pipeline;
mod router;

pub use aggregator::{ResultAggregator, PREDICTIONS_COLUMN};
pub use config::InferenceConfig;
pub use dispatcher::{
    reconcile, ClusterAssignment, ModelDispatcher, PartitionPrediction, PredictionResult,
};
pub use pipeline::{PipelineRun, PredictionPipeline};
pub use router::ClusterRouter;
