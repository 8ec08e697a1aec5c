//! Logging setup and file handling for the `raster-sim` subcommands.

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use log::LevelFilter;

/// Install the process logger.
///
/// Records carry a local timestamp and their target, so engine diagnostics
/// (target `beliefraster`) can be told apart from the CLI's own messages. With
/// `log_file` the output is appended to that file, otherwise it goes to stderr.
pub fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level: LevelFilter = log_level
        .parse()
        .map_err(|_| format!("unknown log level '{log_level}' (expected off, error, warn, info, debug or trace)"))?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {}: {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    if let Some(path) = log_file {
        ensure_parent(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}

/// Create the parent directory of `path` when it has one.
pub fn ensure_parent(path: &Path) -> Result<(), Box<dyn Error>> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Particle files named by `input`: the file itself, or every `.csv` directly
/// inside a directory in name order.
pub fn particle_files(input: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if input.is_file() {
        return if is_csv(input) {
            Ok(vec![input.to_path_buf()])
        } else {
            Err(format!("{} is not a particle CSV file", input.display()).into())
        };
    }
    if !input.is_dir() {
        return Err(format!("no particle file or directory at {}", input.display()).into());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && is_csv(&path) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(format!("{} contains no particle CSV files", input.display()).into());
    }
    files.sort();
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Make sure rasters can be written into `output`, creating it if needed.
pub fn prepare_output_dir(output: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(output)?;
    if !output.is_dir() {
        return Err(format!("{} is not a directory", output.display()).into());
    }
    Ok(())
}

/// Output file for `input` inside `output_dir`: `<stem><suffix>`.
pub fn output_file(input: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("particles");
    output_dir.join(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().expect("temp dir");
        for name in ["b.csv", "a.CSV", "notes.txt"] {
            fs::write(dir.path().join(name), "x\n").expect("write");
        }
        let files = particle_files(dir.path()).expect("csv files");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, ["a.CSV", "b.csv"]);
        assert!(particle_files(&dir.path().join("notes.txt")).is_err());
    }

    #[test]
    fn missing_or_empty_inputs_are_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(particle_files(dir.path()).is_err());
        assert!(particle_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn output_dir_is_created_but_must_be_a_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("a").join("b");
        prepare_output_dir(&nested).expect("create");
        assert!(nested.is_dir());

        let file = dir.path().join("taken");
        fs::write(&file, "").expect("write");
        assert!(prepare_output_dir(&file).is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(init_logger("loud", None).is_err());
    }

    #[test]
    fn output_names_follow_input_stem() {
        let out = output_file(Path::new("/data/run_07.csv"), Path::new("/tmp/out"), "_raster.csv");
        assert_eq!(out, PathBuf::from("/tmp/out/run_07_raster.csv"));
    }
}
