use clap::Args;
use std::path::PathBuf;

/// Runtime settings, read from flags or the environment.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// SQLite database file
    #[arg(
        long,
        short = 'd',
        env = "FACILITY_DATABASE",
        default_value = "facility.db",
        global = true
    )]
    pub database: PathBuf,

    /// Directory holding uploaded document files
    #[arg(long, env = "FACILITY_BLOB_DIR", default_value = "blobs", global = true)]
    pub blob_dir: PathBuf,

    /// Log filter directives, e.g. `debug` or `facility_admin=debug`
    #[arg(long = "log", env = "RUST_LOG", global = true)]
    pub log_filter: Option<String>,

    /// Space (tenant) name commands act on
    #[arg(long, env = "FACILITY_SPACE", global = true)]
    pub space: Option<String>,
}

impl Settings {
    pub fn new(database: impl Into<PathBuf>, blob_dir: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            blob_dir: blob_dir.into(),
            log_filter: None,
            space: None,
        }
    }

    pub fn database_path(&self) -> String {
        self.database.to_string_lossy().into_owned()
    }
}
