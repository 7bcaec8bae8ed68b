pub use assign::{RadiusPolicy, UnassignedMethod};
pub use clustering::{ClusteringResult, ClusteringStats, UNASSIGNED};
pub use distance::{DistanceIndex, SearchMethod};
pub use error::{Error, Result};
pub use nng::NeighborGraph;
pub use nng_clustering::{cluster, cluster_batches, cluster_typed, NngClustering};
pub use options::ClusterOptions;
pub use seed::SeedMethod;
pub use types::TypeConstraints;

mod algorithm;
mod assign;
mod clustering;
mod distance;
mod error;
mod nng;
mod nng_clustering;
mod options;
mod seed;
mod types;
