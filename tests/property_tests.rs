use nngclust::{cluster, cluster_batches, cluster_typed, DistanceIndex, Error, TypeConstraints};
use proptest::prelude::*;

const SEED_METHODS: [&str; 6] = [
    "lexical",
    "inwards_order",
    "inwards_updating",
    "inwards_alt_updating",
    "exclusion_order",
    "exclusion_updating",
];

fn line(x: &[f64]) -> DistanceIndex<f64> {
    let data = x
        .iter()
        .flat_map(|a| x.iter().map(move |b| (a - b).abs()))
        .collect();
    DistanceIndex::new(x.len(), x.len(), data).unwrap()
}

proptest! {
    #[test]
    fn prop_clusters_meet_size_constraint(
        x in prop::collection::vec(-100.0f64..100.0, 1..30),
        size in 1usize..5,
        method in prop::sample::select(SEED_METHODS.to_vec())
    ) {
        // Skip if size > n
        if size <= x.len() {
            let index = line(&x);
            let result = cluster(&index, size, method, "by_nng", None, None, "closest_seed", None).unwrap();

            prop_assert_eq!(result.len(), x.len());
            prop_assert!(result.num_clusters() >= 1);
            prop_assert!(result.is_valid(size, None));
            prop_assert_eq!(result.num_assigned(), x.len());
            for &l in result.labels().iter().flatten() {
                prop_assert!(l < result.num_clusters());
            }
        }
    }

    #[test]
    fn prop_typed_clusters_meet_every_quota(
        points in prop::collection::vec((-100.0f64..100.0, 0i32..2), 2..25),
        total in 2usize..5,
        method in prop::sample::select(SEED_METHODS.to_vec()),
        secondary in prop::sample::select(vec!["ignore", "closest_seed"])
    ) {
        // Skip if the typed clique does not fit
        if total <= points.len() {
            let x: Vec<f64> = points.iter().map(|p| p.0).collect();
            let types: Vec<i32> = points.iter().map(|p| p.1).collect();
            let index = line(&x);
            let outcome = cluster_typed(&index, &types, &[1, 1], total, method, "by_nng", None, None, secondary, None);
            if types.iter().all(|&t| t == types[0]) {
                prop_assert!(matches!(outcome, Err(Error::InfeasibleConstraint(_))));
            } else {
                let result = outcome.unwrap();
                let constraints = TypeConstraints::new(&types, &[1, 1], total).unwrap();
                prop_assert!(result.num_clusters() >= 1);
                prop_assert!(result.is_valid(total, Some(&constraints)));
                for c in 0..result.num_clusters() {
                    prop_assert_eq!(result.remaining_quota(c, 0, &constraints), 0);
                    prop_assert_eq!(result.remaining_quota(c, 1, &constraints), 0);
                }
            }
        }
    }

    #[test]
    fn prop_ignore_keeps_only_seed_cliques(
        x in prop::collection::vec(-100.0f64..100.0, 2..30),
        size in 2usize..5,
        method in prop::sample::select(SEED_METHODS.to_vec())
    ) {
        if size <= x.len() {
            let index = line(&x);
            let result = cluster(&index, size, method, "ignore", None, None, "ignore", None).unwrap();
            prop_assert_eq!(result.num_assigned(), size * result.num_clusters());
            prop_assert_eq!(result.cluster_sizes(), vec![size; result.num_clusters()]);
        }
    }

    #[test]
    fn prop_batches_equal_lexical(
        x in prop::collection::vec(-100.0f64..100.0, 2..30),
        size in 1usize..4,
        batch_size in 1usize..10
    ) {
        if size <= x.len() {
            let index = line(&x);
            let lexical = cluster(&index, size, "lexical", "closest_assigned", None, None, "ignore", None).unwrap();
            let batched = cluster_batches(&index, size, "closest_assigned", None, None, batch_size).unwrap();
            prop_assert_eq!(lexical, batched);
        }
    }
}
