use clap::Args;
use openconsent::config::AppConfig;
use openconsent::decisions::{write_csv, DecisionRepository, JsonFileDecisionRepository};
use openconsent::error::AppError;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// JSON decision store to read (defaults to APP_DATA_PATH)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// File to write; stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let data = match args.data {
        Some(path) => Some(path),
        None => AppConfig::load()?.storage.data_path,
    };
    let data = require_store(data)?;

    match args.output {
        Some(path) => {
            let count = export_store(&data, File::create(&path)?)?;
            eprintln!("wrote {count} decisions to {}", path.display());
        }
        None => {
            export_store(&data, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn require_store(data: Option<PathBuf>) -> Result<PathBuf, AppError> {
    data.ok_or_else(|| {
        AppError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "no decision store configured (pass --data or set APP_DATA_PATH)",
        ))
    })
}

/// Write the store at `data` as CSV into `out`, returning the number of decisions.
///
/// The store must already exist; opening would otherwise start an empty one.
pub(crate) fn export_store<W: Write>(data: &Path, out: W) -> Result<usize, AppError> {
    if !data.exists() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("decision store {} does not exist", data.display()),
        )));
    }
    let repository = JsonFileDecisionRepository::open(data)?;
    let decisions = repository.all()?;
    write_csv(out, &decisions)?;
    Ok(decisions.len())
}
