use num_traits::Float;
use tracing::{debug, info};

use crate::algorithm::Partition;
use crate::assign::{AssignmentEngine, UnassignedMethod};
use crate::clustering::ClusteringResult;
use crate::distance::DistanceIndex;
use crate::error::{Error, Result};
use crate::nng::check_clique_size;
use crate::options::ClusterOptions;
use crate::seed::{SeedMethod, SeedSelector};
use crate::types::TypeConstraints;

/// Size-constrained clustering on a nearest neighbor graph.
///
/// Seeds are chosen so that each one owns a clique of its nearest neighbors
/// large enough to meet the size constraint, with no point shared between
/// cliques. Points outside every clique are then handled by the primary and
/// secondary unassigned methods.
///
///     use nngclust::{ClusterOptions, DistanceIndex, NngClustering, SeedMethod};
///
///     let x = [0., 1., 2., 10., 11., 12.];
///     let data: Vec<f64> = x.iter().flat_map(|a| x.iter().map(move |b| f64::abs(a - b))).collect();
///     let index = DistanceIndex::new(6, 6, data).unwrap();
///     let clustering = NngClustering::new(ClusterOptions::new(3).with_seed_method(SeedMethod::Lexical));
///     let result = clustering.predict(&index).unwrap();
///     assert_eq!(result.num_clusters(), 2);
///     assert_eq!(result.host_labels().unwrap(), vec![0, 0, 0, 1, 1, 1]);
#[derive(Debug, Clone)]
pub struct NngClustering<F> {
    options: ClusterOptions<F>,
}

impl<F> NngClustering<F>
where
    F: Float + Send + Sync,
{
    pub fn new(options: ClusterOptions<F>) -> Self {
        Self { options }
    }

    pub fn with_defaults(size_constraint: usize) -> Self {
        Self::new(ClusterOptions::new(size_constraint))
    }

    pub fn options(&self) -> &ClusterOptions<F> {
        &self.options
    }

    /// Cluster the points of `index`. Either every cluster meets the size and
    /// type constraints or an error is returned.
    pub fn predict(&self, index: &DistanceIndex<F>) -> Result<ClusteringResult> {
        let n = index.len();
        self.options.validate(n)?;
        if let Some(types) = &self.options.type_constraints {
            types.check_feasible()?;
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()
            .map_err(|e| Error::AllocationFailure(e.to_string()))?;
        pool.install(|| self.run(index))
    }

    fn run(&self, index: &DistanceIndex<F>) -> Result<ClusteringResult> {
        let options = &self.options;
        let types = options.type_constraints.as_ref();
        let primary = options
            .primary_data_points
            .as_deref()
            .map(|mask| &mask[..index.len()]);
        let is_primary = |p: usize| primary.map_or(true, |mask| mask[p]);

        let mut partition = Partition::new(index.len());
        let selector = SeedSelector {
            index,
            size_constraint: options.size_constraint,
            types,
            primary,
            radius: options.seed_radius,
        };
        selector.select(options.seed_method, &mut partition)?;
        if partition.num_clusters() == 0 {
            return Err(Error::infeasible(
                "no seed clique satisfies the size constraint within the seed radius",
            ));
        }
        debug!(
            seed_method = %options.seed_method,
            seeds = partition.num_clusters(),
            "seed selection finished"
        );

        let engine = AssignmentEngine {
            index,
            clique_size: check_clique_size(index.len(), options.size_constraint, types)?,
        };
        let pending: Vec<usize> = (0..partition.len())
            .filter(|&p| is_primary(p) && !partition.is_assigned(p))
            .collect();
        let assigned = engine.assign_pass(
            &mut partition,
            &pending,
            options.primary_unassigned_method,
            options.primary_radius,
        );
        debug!(
            method = %options.primary_unassigned_method,
            pending = pending.len(),
            assigned,
            "primary assignment finished"
        );

        let pending: Vec<usize> = (0..partition.len())
            .filter(|&p| !partition.is_assigned(p))
            .collect();
        let assigned = engine.assign_pass(
            &mut partition,
            &pending,
            options.secondary_unassigned_method,
            options.secondary_radius,
        );
        debug!(
            method = %options.secondary_unassigned_method,
            pending = pending.len(),
            assigned,
            "secondary assignment finished"
        );

        let result = partition.into_result();
        if !result.is_valid(options.size_constraint, types) {
            return Err(Error::infeasible(
                "a cluster violates the size or type constraints",
            ));
        }
        info!(
            points = result.len(),
            clusters = result.num_clusters(),
            assigned = result.num_assigned(),
            "clustering finished"
        );
        Ok(result)
    }
}

/// Cluster with the seed and unassigned methods given by name.
///
/// `radius` bounds seed cliques; `secondary_radius` bounds the secondary
/// pass unless the secondary method is `estimated_radius_closest_seed`.
#[allow(clippy::too_many_arguments)]
pub fn cluster<F>(
    index: &DistanceIndex<F>,
    size_constraint: usize,
    seed_method: &str,
    unassigned_method: &str,
    radius: Option<F>,
    primary_data_points: Option<&[bool]>,
    secondary_unassigned_method: &str,
    secondary_radius: Option<F>,
) -> Result<ClusteringResult>
where
    F: Float + Send + Sync,
{
    let seed_method: SeedMethod = seed_method.parse()?;
    let unassigned_method: UnassignedMethod = unassigned_method.parse()?;
    let secondary_unassigned_method: UnassignedMethod = secondary_unassigned_method.parse()?;
    let options = ClusterOptions::new(size_constraint)
        .with_seed_method(seed_method)
        .with_unassigned_methods(unassigned_method, secondary_unassigned_method, secondary_radius)
        .with_seed_radius(radius)
        .with_primary_data_points(primary_data_points.map(<[bool]>::to_vec));
    NngClustering::new(options).predict(index)
}

/// Cluster with seeds searched one batch of `batch_size` points at a time.
/// Points the primary pass leaves unassigned stay unassigned.
pub fn cluster_batches<F>(
    index: &DistanceIndex<F>,
    size_constraint: usize,
    unassigned_method: &str,
    radius: Option<F>,
    primary_data_points: Option<&[bool]>,
    batch_size: usize,
) -> Result<ClusteringResult>
where
    F: Float + Send + Sync,
{
    let unassigned_method: UnassignedMethod = unassigned_method.parse()?;
    let options = ClusterOptions::new(size_constraint)
        .with_seed_method(SeedMethod::Batches { batch_size })
        .with_unassigned_methods(unassigned_method, UnassignedMethod::Ignore, None)
        .with_seed_radius(radius)
        .with_primary_data_points(primary_data_points.map(<[bool]>::to_vec));
    NngClustering::new(options).predict(index)
}

/// Cluster so that every cluster holds at least `type_size_constraints[t]`
/// points labelled `t` and at least `total_size_constraint` points overall.
#[allow(clippy::too_many_arguments)]
pub fn cluster_typed<F>(
    index: &DistanceIndex<F>,
    type_labels: &[i32],
    type_size_constraints: &[i32],
    total_size_constraint: usize,
    seed_method: &str,
    unassigned_method: &str,
    radius: Option<F>,
    primary_data_points: Option<&[bool]>,
    secondary_unassigned_method: &str,
    secondary_radius: Option<F>,
) -> Result<ClusteringResult>
where
    F: Float + Send + Sync,
{
    if type_labels.len() != index.len() {
        return Err(Error::invalid(format!(
            "{} type labels for {} points",
            type_labels.len(),
            index.len()
        )));
    }
    let types = TypeConstraints::new(type_labels, type_size_constraints, total_size_constraint)?;
    let seed_method: SeedMethod = seed_method.parse()?;
    let unassigned_method: UnassignedMethod = unassigned_method.parse()?;
    let secondary_unassigned_method: UnassignedMethod = secondary_unassigned_method.parse()?;
    let options = ClusterOptions::new(total_size_constraint)
        .with_type_constraints(types)
        .with_seed_method(seed_method)
        .with_unassigned_methods(unassigned_method, secondary_unassigned_method, secondary_radius)
        .with_seed_radius(radius)
        .with_primary_data_points(primary_data_points.map(<[bool]>::to_vec));
    NngClustering::new(options).predict(index)
}
