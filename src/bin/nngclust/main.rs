#[macro_use]
extern crate clap;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::str::FromStr;

use num_traits::Float;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use nngclust::{
    ClusterOptions, DistanceIndex, NngClustering, SearchMethod, SeedMethod, TypeConstraints,
    UnassignedMethod,
};

use crate::ops::{display_results, from_file, labels_from_file, mask_from_file, parse_list};

mod ops;

struct Settings {
    input: PathBuf,
    delimiter: String,
    has_ids: bool,
    size: usize,
    seed_method: SeedMethod,
    unassigned: UnassignedMethod,
    secondary_unassigned: UnassignedMethod,
    radius: Option<f64>,
    secondary_radius: Option<f64>,
    primary: Option<PathBuf>,
    batch_size: Option<usize>,
    types: Option<(PathBuf, Vec<i32>)>,
    search: SearchMethod,
    threads: usize,
}

fn parse_or_exit<T: FromStr>(value: &str, name: &str) -> T {
    value.parse::<T>().unwrap_or_else(|_| {
        eprintln!("Unable to parse {}", name);
        exit(1);
    })
}

fn main() {
    let matches = clap_app!(nngclust =>
        (version: "0.1.0")
        (about: "Size-constrained clustering on a nearest neighbor graph")
        (@arg INPUT: -i --input +takes_value +required "Path to square distance matrix file")
        (@arg SIZE: -s --size +takes_value +required "Minimum cluster size")
        (@arg SEED_METHOD: --seed_method +takes_value "Seed selection method, default=exclusion_updating")
        (@arg UNASSIGNED: --unassigned +takes_value "Primary unassigned method, default=by_nng")
        (@arg RADIUS: --radius +takes_value "Largest distance within a seed clique")
        (@arg PRIMARY: --primary +takes_value "File of 1/0 flags marking primary data points")
        (@arg SECONDARY: --secondary_unassigned +takes_value "Secondary unassigned method, default=ignore")
        (@arg SECONDARY_RADIUS: --secondary_radius +takes_value "Radius bounding the secondary pass")
        (@arg BATCH_SIZE: --batch_size +takes_value "Search seeds in batches of this many points")
        (@arg TYPES: --types +takes_value "File of integer type labels, one per point")
        (@arg TYPE_SIZES: --type_sizes +takes_value "Comma-separated minimum count of each type")
        (@arg APPROXIMATE: --approximate +takes_value "Approximate neighbor search over this many buckets")
        (@arg PROBES: --probes +takes_value "Buckets scanned per approximate query, default=2")
        (@arg THREADS: -t --threads +takes_value "Number of worker threads, default=4")
        (@arg DELIMITER: -d --delimiter +takes_value "Column delimiter, default=tab")
        (@arg IDS: --ids "First column of the input holds point ids")
        (@arg PRECISION: -r --precision +takes_value "Set f32 or f64 precision, default=f32")
        (@arg VERBOSE: -v --verbose "Log progress to stderr")
    )
    .get_matches();

    let level = if matches.is_present("VERBOSE") {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Unable to install logger");
        exit(1);
    }

    let input = matches.value_of("INPUT").unwrap_or_default();
    if !Path::new(input).exists() {
        eprintln!("Unable to locate input file {}", input);
        exit(1);
    }
    let size = parse_or_exit::<usize>(matches.value_of("SIZE").unwrap_or_default(), "size");
    let seed_method = parse_or_exit::<SeedMethod>(
        matches.value_of("SEED_METHOD").unwrap_or("exclusion_updating"),
        "seed_method",
    );
    let unassigned = parse_or_exit::<UnassignedMethod>(
        matches.value_of("UNASSIGNED").unwrap_or("by_nng"),
        "unassigned",
    );
    let secondary_unassigned = parse_or_exit::<UnassignedMethod>(
        matches.value_of("SECONDARY").unwrap_or("ignore"),
        "secondary_unassigned",
    );
    let radius = matches
        .value_of("RADIUS")
        .map(|r| parse_or_exit::<f64>(r, "radius"));
    let secondary_radius = matches
        .value_of("SECONDARY_RADIUS")
        .map(|r| parse_or_exit::<f64>(r, "secondary_radius"));
    let batch_size = matches
        .value_of("BATCH_SIZE")
        .map(|b| parse_or_exit::<usize>(b, "batch_size"));
    let types = match (matches.value_of("TYPES"), matches.value_of("TYPE_SIZES")) {
        (Some(path), Some(sizes)) => {
            let sizes = parse_list(sizes).unwrap_or_else(|e| {
                eprintln!("{}", e);
                exit(1);
            });
            Some((PathBuf::from(path), sizes))
        }
        (None, None) => None,
        _ => {
            eprintln!("--types and --type_sizes must be given together");
            exit(2);
        }
    };
    let search = match matches.value_of("APPROXIMATE") {
        Some(buckets) => SearchMethod::Approximate {
            buckets: parse_or_exit::<usize>(buckets, "approximate"),
            probes: parse_or_exit::<usize>(matches.value_of("PROBES").unwrap_or("2"), "probes"),
        },
        None => SearchMethod::Exact,
    };
    let threads = parse_or_exit::<usize>(matches.value_of("THREADS").unwrap_or("4"), "threads");
    // Validate values
    if size < 1 || threads < 1 || batch_size == Some(0) {
        eprintln!("Improper parameter set!");
        exit(2);
    }
    if batch_size.is_some() && types.is_some() {
        eprintln!("Batch seeding does not support type constraints");
        exit(2);
    }

    let settings = Settings {
        input: PathBuf::from(input),
        delimiter: matches.value_of("DELIMITER").unwrap_or("\t").to_string(),
        has_ids: matches.is_present("IDS"),
        size,
        seed_method,
        unassigned,
        secondary_unassigned,
        radius,
        secondary_radius,
        primary: matches.value_of("PRIMARY").map(PathBuf::from),
        batch_size,
        types,
        search,
        threads,
    };
    let outcome = match matches.value_of("PRECISION").unwrap_or("f32") {
        "f64" => run::<f64>(&settings),
        _ => run::<f32>(&settings),
    };
    if let Err(e) = outcome {
        eprintln!("{}", e);
        exit(1);
    }
}

fn to_float<F: Float>(r: Option<f64>) -> Result<Option<F>, Box<dyn Error>> {
    r.map(|r| {
        F::from(r).ok_or_else(|| Box::<dyn Error>::from(format!("radius {} out of range", r)))
    })
    .transpose()
}

fn run<F>(settings: &Settings) -> Result<(), Box<dyn Error>>
where
    F: Float + Send + Sync + FromStr,
{
    let (distances, ids) = from_file::<F>(&settings.input, &settings.delimiter, settings.has_ids)?;
    let index = DistanceIndex::from_array(distances)?.with_search(settings.search)?;
    let primary = match &settings.primary {
        Some(p) => Some(mask_from_file(p)?),
        None => None,
    };

    let mut options = ClusterOptions::new(settings.size)
        .with_seed_method(settings.seed_method)
        .with_unassigned_methods(
            settings.unassigned,
            settings.secondary_unassigned,
            to_float(settings.secondary_radius)?,
        )
        .with_seed_radius(to_float(settings.radius)?)
        .with_primary_data_points(primary)
        .with_threads(settings.threads);
    if let Some(batch_size) = settings.batch_size {
        options = options
            .with_seed_method(SeedMethod::Batches { batch_size })
            .with_unassigned_methods(settings.unassigned, UnassignedMethod::Ignore, None);
    }
    if let Some((path, sizes)) = &settings.types {
        let labels = labels_from_file(path)?;
        options = options.with_type_constraints(TypeConstraints::new(
            &labels,
            sizes,
            settings.size,
        )?);
    }

    let result = NngClustering::new(options).predict(&index)?;
    display_results(&result, &ids)?;
    Ok(())
}
