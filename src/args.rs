use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::driver::DriverSettings;
use crate::pipeline::BatchSettings;
use crate::request::VideoSource;
use crate::style::Quality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Single,
    Batch,
    Stats,
}

#[derive(Parser, Debug)]
#[clap(about = "Turns a pool of facts into short rendered videos")]
pub struct Args {
    #[clap(long, env = "FACTREELS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    #[clap(long, default_value = "fact_database.json")]
    pub facts: PathBuf,

    #[clap(long, default_value = "used_facts.json")]
    pub used: PathBuf,

    #[clap(long, value_enum, default_value = "single")]
    pub mode: Mode,

    #[clap(long, default_value_t = 3)]
    pub count: usize,

    #[clap(long, default_value_t = 1)]
    pub concurrency: usize,

    #[clap(long, value_enum, default_value = "high")]
    pub quality: Quality,

    #[clap(long)]
    pub voice: Option<String>,

    #[clap(long)]
    pub theme: Option<String>,

    #[clap(long, value_enum, default_value = "pexels")]
    pub source: VideoSource,

    /// Directory of background clips for `--source local`.
    #[clap(long)]
    pub materials_dir: Option<PathBuf>,

    #[clap(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// 0 waits forever.
    #[clap(long, default_value_t = 1800)]
    pub timeout_secs: u64,

    #[clap(long, default_value_t = 3)]
    pub max_malformed: u32,

    /// Defaults to the quality preset's delay.
    #[clap(long)]
    pub batch_delay_secs: Option<u64>,

    #[clap(long, default_value = "storage")]
    pub storage_dir: PathBuf,

    #[clap(long, default_value = "upload_log.json")]
    pub upload_log: PathBuf,

    #[clap(long)]
    pub seed: Option<u64>,

    #[clap(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
            max_malformed: self.max_malformed,
            ..DriverSettings::default()
        }
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            delay: self
                .batch_delay_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| self.quality.batch_delay()),
            storage_dir: self.storage_dir.clone(),
            ..BatchSettings::default()
        }
    }
}
