use crate::{error::Error, fetch, Result};
use derive_deref::Deref;
use itertools::Itertools;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Columns every play-by-play dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 6] =
    ["posteam", "defteam", "play_type", "sack", "qb_hit", "epa"];

/// Columns kept alongside the required ones when several seasons are stacked,
/// provided every season has them.
pub const CONTEXT_COLUMNS: [&str; 3] = ["season", "week", "season_type"];

const STRING_COLUMNS: [&str; 3] = ["posteam", "defteam", "play_type"];
const FLOAT_COLUMNS: [&str; 3] = ["sack", "qb_hit", "epa"];

#[derive(Clone, Deref)]
pub struct PbpDf(DataFrame);

impl PbpDf {
    /// Wraps a play-by-play frame after checking it has every required column.
    ///
    /// Team and play type columns are cast to strings, indicator and EPA columns to
    /// floats. Other columns pass through untouched.
    pub fn new(df: DataFrame) -> Result<Self> {
        validate_columns(&df)?;

        let df = df.lazy().with_columns(required_casts()).collect()?;
        Ok(PbpDf(df))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let df = crate::load_parquet(path)?;
        Self::new(df)
    }

    /// Loads and stacks the play-by-play data of every season.
    ///
    /// Seasons are read from `<data_dir>/pbp_<season>.parquet`. A missing file is
    /// downloaded from `download_url` first when one is given.
    pub fn load_seasons(
        seasons: &[u16],
        data_dir: &Path,
        download_url: Option<&str>,
    ) -> Result<Self> {
        log::trace!("pbp::load_seasons {:?}", seasons);
        let mut frames = Vec::with_capacity(seasons.len());
        for &season in seasons {
            let path = season_path(data_dir, season);
            if !path.exists() {
                match download_url {
                    Some(url) => {
                        fetch::download_season(season, data_dir, url)?;
                    }
                    None => {
                        return Err(Error::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!("{} not found", path.display()),
                        )));
                    }
                }
            }
            let df = crate::load_parquet(&path)?;
            validate_columns(&df)?;
            log::info!("Loaded {} plays for {}", df.height(), season);
            frames.push(df);
        }

        let context: Vec<&str> = CONTEXT_COLUMNS
            .into_iter()
            .filter(|name| frames.iter().all(|df| has_column(df, name)))
            .collect();
        let columns = REQUIRED_COLUMNS.iter().chain(&context).collect_vec();
        log::debug!("Keeping columns {:?}", columns);

        let mut stacked: Option<DataFrame> = None;
        for df in frames {
            let df = df.lazy().select(projection(&context)).collect()?;
            stacked = Some(match stacked {
                Some(acc) => acc.vstack(&df)?,
                None => df,
            });
        }

        let df = stacked.ok_or(Error::NoSeasons)?;
        Self::new(df)
    }

    pub fn filter(self, filter: Expr) -> Result<Self> {
        let df = self.0.lazy().filter(filter).collect()?;
        Ok(PbpDf(df))
    }
}

pub fn season_path(data_dir: &Path, season: u16) -> PathBuf {
    data_dir.join(format!("pbp_{}.parquet", season))
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().contains(&name)
}

fn validate_columns(df: &DataFrame) -> Result<()> {
    match REQUIRED_COLUMNS.iter().find(|name| !has_column(df, name)) {
        Some(missing) => Err(Error::MissingColumn(missing.to_string())),
        None => Ok(()),
    }
}

fn required_casts() -> Vec<Expr> {
    STRING_COLUMNS
        .iter()
        .map(|name| col(name).cast(DataType::String))
        .chain(
            FLOAT_COLUMNS
                .iter()
                .map(|name| col(name).cast(DataType::Float64)),
        )
        .collect()
}

// Fixed types so that seasons with differently inferred columns still stack
fn projection(context: &[&str]) -> Vec<Expr> {
    let mut exprs = required_casts();
    for name in context {
        let dtype = match *name {
            "season_type" => DataType::String,
            _ => DataType::Int32,
        };
        exprs.push(col(name).cast(dtype));
    }
    exprs
}
