use crate::{error::Error, pbp::season_path, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Release holding one play-by-play parquet file per season.
pub const NFLVERSE_PBP_URL: &str =
    "https://github.com/nflverse/nflverse-data/releases/download/pbp";

pub fn season_url(base_url: &str, season: u16) -> String {
    format!("{}/play_by_play_{}.parquet", base_url.trim_end_matches('/'), season)
}

/// Downloads one season into `data_dir`, returning the cached file path.
pub fn download_season(season: u16, data_dir: &Path, base_url: &str) -> Result<PathBuf> {
    let url = season_url(base_url, season);
    log::info!("Downloading {}", url);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    let response = client.get(&url).send()?;

    if !response.status().is_success() {
        return Err(Error::Download {
            url,
            status: response.status().as_u16(),
        });
    }

    let bytes = response.bytes()?;
    std::fs::create_dir_all(data_dir)?;
    let path = season_path(data_dir, season);
    // only complete downloads are renamed into the cache
    let partial = path.with_extension("parquet.part");
    std::fs::write(&partial, &bytes)?;
    std::fs::rename(&partial, &path)?;

    log::debug!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
