//! Sample to database mapping
//!
//! Every sample declared by an uploaded file gets a fresh internal id, and its
//! variants live in `<db_dir>/<id>.db`. The mapping is fixed once created.

use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DB_EXTENSION: &str = "db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleEntry {
    pub internal_id: Uuid,
    pub sample: String,
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleSession {
    entries: Vec<SampleEntry>,
}

impl SampleSession {
    pub fn new(samples: &[String], db_dir: &Path) -> Self {
        let entries = samples
            .iter()
            .map(|sample| {
                let internal_id = Uuid::new_v4();
                SampleEntry {
                    internal_id,
                    sample: sample.clone(),
                    db_path: db_dir.join(format!("{}.{}", internal_id, DB_EXTENSION)),
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[SampleEntry] {
        &self.entries
    }

    /// First declared sample; uploads are ingested into its store
    pub fn primary(&self) -> Option<&SampleEntry> {
        self.entries.first()
    }

    pub fn lookup(&self, sample: &str) -> Option<&SampleEntry> {
        self.entries.iter().find(|e| e.sample == sample)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
