use polars::prelude::*;
use std::path::Path;

pub mod aggregate;
mod error;
pub mod fetch;
pub mod filter;
pub mod firestore;
pub mod grade;
pub mod merge;
pub mod pbp;
pub mod publish;

pub use aggregate::{Category, TeamRole};
pub use error::Error;
pub use merge::{grade_teams, GradesDf, TeamGrades};
pub use pbp::PbpDf;
pub use publish::{DocumentStore, PublishEvent, PublishReport, Publisher};

pub type Result<T> = std::result::Result<T, error::Error>;

/// Collection that team documents are written to unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "team_analytics";

pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let mut file = std::fs::File::open(path)?;
    let df = ParquetReader::new(&mut file).finish()?;
    Ok(df)
}
