use num_traits::Float;

use crate::assign::{RadiusPolicy, UnassignedMethod};
use crate::error::{Error, Result};
use crate::nng::check_clique_size;
use crate::seed::SeedMethod;
use crate::types::TypeConstraints;

/// Settings for one clustering call.
///
/// - size_constraint: minimum number of points in every cluster
/// - seed_method: order in which seed candidates are examined
/// - primary_unassigned_method: handling of primary points left over after seeding
/// - secondary_unassigned_method: handling of every point still unassigned after the primary pass
/// - seed_radius: largest distance between a seed and a member of its clique
/// - primary_radius / secondary_radius: radius policy of each assignment pass
/// - primary_data_points: points allowed to become seeds and to join clusters in the primary pass; all points when `None`
/// - type_constraints: per-type minimum counts
/// - threads: worker threads used for neighbor searches
#[derive(Debug, Clone)]
pub struct ClusterOptions<F> {
    pub size_constraint: usize,
    pub seed_method: SeedMethod,
    pub primary_unassigned_method: UnassignedMethod,
    pub secondary_unassigned_method: UnassignedMethod,
    pub seed_radius: Option<F>,
    pub primary_radius: RadiusPolicy<F>,
    pub secondary_radius: RadiusPolicy<F>,
    pub primary_data_points: Option<Vec<bool>>,
    pub type_constraints: Option<TypeConstraints>,
    pub threads: usize,
}

impl<F> Default for ClusterOptions<F> {
    fn default() -> Self {
        ClusterOptions {
            size_constraint: 2,
            seed_method: SeedMethod::ExclusionUpdating,
            primary_unassigned_method: UnassignedMethod::AnyNeighbor,
            secondary_unassigned_method: UnassignedMethod::Ignore,
            seed_radius: None,
            primary_radius: RadiusPolicy::SeedRadius,
            secondary_radius: RadiusPolicy::Unbounded,
            primary_data_points: None,
            type_constraints: None,
            threads: 4,
        }
    }
}

impl<F> ClusterOptions<F>
where
    F: Float,
{
    pub fn new(size_constraint: usize) -> Self {
        ClusterOptions {
            size_constraint,
            ..Default::default()
        }
    }

    pub fn with_seed_method(mut self, seed_method: SeedMethod) -> Self {
        self.seed_method = seed_method;
        self
    }

    /// Set both unassigned methods along with their radius policies. The
    /// primary pass is bounded by the seed clique radius and the secondary
    /// pass by `secondary_radius`; `estimated_radius_closest_seed` replaces
    /// either bound with the estimated radius.
    pub fn with_unassigned_methods(
        mut self,
        primary: UnassignedMethod,
        secondary: UnassignedMethod,
        secondary_radius: Option<F>,
    ) -> Self {
        self.primary_unassigned_method = primary;
        self.primary_radius = primary_policy(primary);
        self.secondary_unassigned_method = secondary;
        self.secondary_radius = secondary_policy(secondary, secondary_radius);
        self
    }

    pub fn with_seed_radius(mut self, radius: Option<F>) -> Self {
        self.seed_radius = radius;
        self
    }

    pub fn with_primary_data_points(mut self, primary: Option<Vec<bool>>) -> Self {
        self.primary_data_points = primary;
        self
    }

    /// Also raises the size constraint to the typed clique size
    pub fn with_type_constraints(mut self, types: TypeConstraints) -> Self {
        self.size_constraint = types.clique_size();
        self.type_constraints = Some(types);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Check the options against a data set of `n` points
    pub fn validate(&self, n: usize) -> Result<()> {
        if self.threads < 1 {
            return Err(Error::invalid("at least one worker thread is required"));
        }
        if let SeedMethod::Batches { batch_size: 0 } = self.seed_method {
            return Err(Error::invalid("batch size must be positive"));
        }
        if self.size_constraint == 0 {
            return Err(Error::invalid("size constraint must be positive"));
        }
        check_clique_size(n, self.size_constraint, self.type_constraints.as_ref())?;
        if let Some(r) = self.seed_radius {
            RadiusPolicy::Supplied(r).check()?;
        }
        self.primary_radius.check()?;
        self.secondary_radius.check()?;
        if let Some(primary) = &self.primary_data_points {
            if primary.len() < n {
                return Err(Error::invalid(format!(
                    "primary data point mask has {} entries for {} points",
                    primary.len(),
                    n
                )));
            }
        }
        if let Some(types) = &self.type_constraints {
            if types.len() != n {
                return Err(Error::invalid(format!(
                    "{} type labels for {} points",
                    types.len(),
                    n
                )));
            }
        }
        Ok(())
    }
}

fn primary_policy<F>(method: UnassignedMethod) -> RadiusPolicy<F> {
    if method.uses_estimated_radius() {
        RadiusPolicy::Estimated
    } else {
        RadiusPolicy::SeedRadius
    }
}

// The estimated radius takes precedence over a supplied one
fn secondary_policy<F>(method: UnassignedMethod, radius: Option<F>) -> RadiusPolicy<F> {
    if method.uses_estimated_radius() {
        RadiusPolicy::Estimated
    } else {
        radius.map_or(RadiusPolicy::Unbounded, RadiusPolicy::Supplied)
    }
}
