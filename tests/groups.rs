use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ndarray::Array2;

use nngclust::{
    ClusterOptions, ClusteringResult, DistanceIndex, NngClustering, SearchMethod, SeedMethod,
    UnassignedMethod,
};

/// Loads `group x y` rows and returns the euclidean distance matrix along
/// with the group of every row
fn load_data(test_file: PathBuf) -> std::io::Result<(Array2<f64>, Vec<usize>)> {
    let reader = BufReader::new(File::open(test_file)?);
    let mut groups = Vec::new();
    let mut points = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let mut line = line.split(' ');
        groups.push(line.next().unwrap().parse::<usize>().unwrap());
        let point: Vec<f64> = line.map(|c| c.parse::<f64>().unwrap()).collect();
        points.push(point);
    }
    let n = points.len();
    let distances = Array2::from_shape_fn((n, n), |(i, j)| {
        points[i]
            .iter()
            .zip(points[j].iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    });
    Ok((distances, groups))
}

fn file<A: AsRef<OsStr>>(path: A) -> PathBuf {
    let test_dir = Path::new(file!()).parent().unwrap();
    test_dir.join(Path::new("data")).join(Path::new(&path))
}

fn assert_pure(result: &ClusteringResult, groups: &[usize]) {
    let mut owner: HashMap<usize, usize> = HashMap::new();
    for (p, label) in result.labels().iter().enumerate() {
        if let Some(c) = label {
            let group = *owner.entry(*c).or_insert(groups[p]);
            assert_eq!(group, groups[p], "cluster {} mixes groups", c);
        }
    }
}

fn run_test(search: SearchMethod, seed_method: SeedMethod) {
    let (distances, groups) = load_data(file("four-groups.test")).unwrap();
    let index = DistanceIndex::from_array(distances)
        .unwrap()
        .with_search(search)
        .unwrap();
    let options = ClusterOptions::new(4)
        .with_seed_method(seed_method)
        .with_unassigned_methods(UnassignedMethod::AnyNeighbor, UnassignedMethod::ClosestSeed, None)
        .with_threads(2);
    let result = NngClustering::new(options).predict(&index).unwrap();
    assert!(result.num_clusters() >= 4);
    assert_eq!(result.num_assigned(), groups.len());
    assert!(result.is_valid(4, None));
    assert_pure(&result, &groups);

    let stats = result.stats(&index).unwrap();
    assert_eq!(stats.num_data_points, 48);
    assert_eq!(stats.num_populated_clusters, result.num_clusters());
    assert!(stats.min_cluster_size >= 4);
    // Points of one group lie within a 8 x 8 box
    assert!(stats.max_dist < 12.);
}

#[test]
fn exact_exclusion_updating() {
    run_test(SearchMethod::Exact, SeedMethod::ExclusionUpdating);
}

#[test]
fn exact_inwards_alt_updating() {
    run_test(SearchMethod::Exact, SeedMethod::InwardsAltUpdating);
}

#[test]
fn approximate_lexical() {
    run_test(
        SearchMethod::Approximate {
            buckets: 4,
            probes: 1,
        },
        SeedMethod::Lexical,
    );
}

#[test]
fn f32_and_f64_precision() {
    let (distances, _) = load_data(file("four-groups.test")).unwrap();
    let wide = DistanceIndex::from_array(distances.clone()).unwrap();
    let narrow = DistanceIndex::from_array(distances.mapv(|d| d as f32)).unwrap();
    let wide = NngClustering::with_defaults(5).predict(&wide).unwrap();
    let narrow = NngClustering::with_defaults(5).predict(&narrow).unwrap();
    assert!(wide.is_valid(5, None));
    assert!(narrow.is_valid(5, None));
    assert_eq!(wide.len(), narrow.len());
}
