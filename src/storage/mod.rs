pub mod table;

use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

use crate::tracker::ActivityTracker;

use self::table::{parse_table, render_table};

pub const DATA_FILE_NAME: &str = "activities.csv";

/// Interface for abstracting persistence of the whole tracker. Raw text
/// access exists because remote sync ships the file contents verbatim.
pub trait TrackerStore {
    /// Loads the persisted tracker, or an empty one when nothing was saved
    /// yet.
    fn load(&self) -> impl Future<Output = Result<ActivityTracker>>;

    /// Replaces the persisted state with `tracker`.
    fn save(&self, tracker: &ActivityTracker) -> impl Future<Output = Result<()>>;

    /// Raw table text, None when no file exists yet.
    fn read_raw(&self) -> impl Future<Output = Result<Option<String>>>;

    /// Overwrites the table file with text received from elsewhere.
    fn write_raw(&self, text: &str) -> impl Future<Output = Result<()>>;
}

/// Stores the tracker as a single CSV file, locked for the duration of each
/// read or write so concurrent commands don't interleave partial data.
pub struct CsvTrackerStore {
    path: PathBuf,
}

impl CsvTrackerStore {
    pub fn new(data_dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(DATA_FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_locked(&self) -> Result<Option<String>> {
        debug!("Reading {:?}", self.path);
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let result = read_to_string(file).await;
        result.map(Some)
    }

    async fn write_locked(&self, text: &str) -> Result<()> {
        debug!("Writing {:?}", self.path);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = async {
            file.write_all(text.as_bytes()).await?;
            file.flush().await?;
            Ok(())
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

async fn read_to_string(mut file: File) -> Result<String> {
    let mut text = String::new();
    let result = file.read_to_string(&mut text).await;
    file.unlock_async().await?;
    result?;
    Ok(text)
}

impl TrackerStore for CsvTrackerStore {
    async fn load(&self) -> Result<ActivityTracker> {
        match self.read_locked().await? {
            Some(text) => Ok(ActivityTracker::from_rows(parse_table(&text))),
            None => Ok(ActivityTracker::new()),
        }
    }

    async fn save(&self, tracker: &ActivityTracker) -> Result<()> {
        self.write_locked(&render_table(&tracker.to_rows())).await
    }

    async fn read_raw(&self) -> Result<Option<String>> {
        self.read_locked().await
    }

    async fn write_raw(&self, text: &str) -> Result<()> {
        self.write_locked(text).await
    }
}
