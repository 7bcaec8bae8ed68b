use std::fmt::{self, Display};
use std::fs::File;
use std::io::{stdout, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use ndarray::Array2;
use num_traits::Float;

use nngclust::ClusteringResult;

#[derive(Debug)]
pub(crate) struct FileParseError {
    pub message: String,
}

impl Display for FileParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FileParseError {}

fn read_lines(p: &Path) -> Result<Vec<String>, FileParseError> {
    let file = File::open(p).map_err(|e| FileParseError {
        message: format!("Unable to open {}: {}", p.display(), e),
    })?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FileParseError {
            message: format!("Unable to read {}: {}", p.display(), e),
        })
}

/// Reads a square distance matrix, one row per line:
///     id1 d11 d12 d13
///     id2 d21 d22 d23
///     id3 d31 d32 d33
///
/// The id column is present only with `has_ids`; otherwise points are
/// named by their 0-based row number.
pub(crate) fn from_file<F>(
    p: &Path,
    d: &str,
    has_ids: bool,
) -> Result<(Array2<F>, Vec<String>), FileParseError>
where
    F: Float + FromStr,
{
    let mut ids = Vec::new();
    let mut data = Vec::new();
    for (idx, line) in read_lines(p)?.iter().enumerate() {
        let mut line = line.trim_end().split(d);
        if has_ids {
            match line.next() {
                Some(id) => ids.push(id.to_string()),
                None => {
                    return Err(FileParseError {
                        message: format!("Error loading id at line {}", idx + 1),
                    })
                }
            }
        } else {
            ids.push(idx.to_string());
        }
        let row = line
            .map(|s| s.trim().parse::<F>())
            .collect::<Result<Vec<F>, _>>()
            .map_err(|_| FileParseError {
                message: format!("Error parsing file at line {}", idx + 1),
            })?;
        data.push(row);
    }
    if data.is_empty() {
        return Err(FileParseError {
            message: "Data file is empty".to_string(),
        });
    }
    let n = data.len();
    if data.iter().any(|row| row.len() != n) {
        return Err(FileParseError {
            message: "Distance matrix must be square!".to_string(),
        });
    }
    let out = Array2::from_shape_vec((n, n), data.into_iter().flatten().collect()).map_err(
        |e| FileParseError {
            message: e.to_string(),
        },
    )?;
    Ok((out, ids))
}

/// One integer type label per line
pub(crate) fn labels_from_file(p: &Path) -> Result<Vec<i32>, FileParseError> {
    read_lines(p)?
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.trim().parse::<i32>().map_err(|_| FileParseError {
                message: format!("Error parsing type label at line {}", idx + 1),
            })
        })
        .collect()
}

/// One flag per line: 1/0 or true/false
pub(crate) fn mask_from_file(p: &Path) -> Result<Vec<bool>, FileParseError> {
    read_lines(p)?
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| match line.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(FileParseError {
                message: format!("Error parsing primary flag at line {}", idx + 1),
            }),
        })
        .collect()
}

/// Comma-separated integers, as in `--type_sizes 2,1`
pub(crate) fn parse_list(s: &str) -> Result<Vec<i32>, FileParseError> {
    s.split(',')
        .map(|v| {
            v.trim().parse::<i32>().map_err(|_| FileParseError {
                message: format!("Unable to parse list entry {}", v),
            })
        })
        .collect()
}

#[cfg(not(tarpaulin_include))]
pub(crate) fn display_results<L>(result: &ClusteringResult, ids: &[L]) -> std::io::Result<()>
where
    L: Display,
{
    let mut writer = BufWriter::new(stdout());
    writeln!(
        writer,
        "nClusters={} nAssigned={} nSamples={}",
        result.num_clusters(),
        result.num_assigned(),
        result.len()
    )?;
    for (id, label) in ids.iter().zip(result.labels()) {
        match label {
            Some(c) => writeln!(writer, "{}\t{}", id, c)?,
            None => writeln!(writer, "{}\tNA", id)?,
        }
    }
    writer.flush()
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use ndarray::arr2;
    use tempfile::NamedTempFile;

    use crate::ops::{from_file, labels_from_file, mask_from_file, parse_list};

    #[test]
    fn valid_load_with_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a\t0.0\t1.0\t4.0").unwrap();
        writeln!(file, "b\t1.0\t0.0\t2.0").unwrap();
        writeln!(file, "c\t4.0\t2.0\t0.0").unwrap();
        let (data, ids) = from_file::<f32>(file.path(), "\t", true).unwrap();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let expected = arr2(&[[0., 1., 4.], [1., 0., 2.], [4., 2., 0.]]);
        assert_eq!(data, expected);
    }

    #[test]
    fn valid_load_without_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.0 3.0").unwrap();
        writeln!(file, "3.0 0.0").unwrap();
        let (data, ids) = from_file::<f64>(file.path(), " ", false).unwrap();
        assert_eq!(ids, vec!["0", "1"]);
        assert_eq!(data[[0, 1]], 3.);
    }

    #[test]
    #[should_panic]
    fn invalid_load_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let (_, _) = from_file::<f32>(file.path(), "\t", false).unwrap();
    }

    #[test]
    #[should_panic]
    fn invalid_load_not_square() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.0\t1.0\t2.0").unwrap();
        writeln!(file, "1.0\t0.0\t2.0").unwrap();
        let (_, _) = from_file::<f32>(file.path(), "\t", false).unwrap();
    }

    #[test]
    #[should_panic]
    fn invalid_load_invalid_data() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id1\t0.0\t1.0").unwrap();
        writeln!(file, "id2\ta\tb").unwrap();
        let (_, _) = from_file::<f32>(file.path(), "\t", true).unwrap();
    }

    #[test]
    #[should_panic]
    fn invalid_file_format() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.0 1.0").unwrap();
        writeln!(file, "1.0 0.0").unwrap();
        let (_, _) = from_file::<f32>(file.path(), "\t", false).unwrap();
    }

    #[test]
    fn labels_and_mask() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0\n1\n1\n").unwrap();
        assert_eq!(labels_from_file(file.path()).unwrap(), vec![0, 1, 1]);

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1\nfalse\ntrue\n0").unwrap();
        assert_eq!(
            mask_from_file(file.path()).unwrap(),
            vec![true, false, true, false]
        );

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "yes").unwrap();
        assert!(mask_from_file(file.path()).is_err());
    }

    #[test]
    fn type_size_list() {
        assert_eq!(parse_list("2, 1").unwrap(), vec![2, 1]);
        assert!(parse_list("2,x").is_err());
    }
}
