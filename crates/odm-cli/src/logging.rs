//! Logger setup for the odm binary.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::LevelFilter;

/// File the log stream is appended to inside `log_dir`.
pub const LOG_FILE_NAME: &str = "odm.log";

/// Install the global logger.
///
/// `info` by default, `debug` when `verbose` is set; `RUST_LOG` overrides
/// both. With a `log_dir` the stream is appended to `<log_dir>/odm.log`,
/// otherwise it goes to stderr. Calling this twice is harmless.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>, String> {
    let mut builder = env_logger::Builder::new();

    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    builder.parse_default_env();

    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;
            let path = dir.join(LOG_FILE_NAME);
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            Some(path)
        }
        None => None,
    };

    let _ = builder.try_init();
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_file_created_in_log_dir() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let path = init_logging(false, Some(&log_dir)).unwrap().unwrap();
        assert_eq!(path, log_dir.join(LOG_FILE_NAME));
        assert!(path.exists());
    }
}
