use std::{
    collections::BTreeMap,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use strsim::jaro_winkler;

use crate::models::ExerciseSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Trainer,
    Trainee,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trainer => "trainer",
            Self::Trainee => "trainee",
        };

        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFmt {
    Human,
    Json,
}

impl OutputFmt {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }
}

/// Prints `value` as JSON, or runs `human` for the colourful rendering.
pub fn emit<T, F>(fmt: OutputFmt, value: &T, human: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(),
{
    match fmt {
        OutputFmt::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFmt::Human => human(),
    }
    Ok(())
}

pub const CONFIG_USER: &str = "user";
pub const CONFIG_DB: &str = "db";
pub const CONFIG_DRAFTS: &str = "drafts";

const DEFAULT_DB: &str = "./spotter.db";
const DEFAULT_DRAFTS: &str = "./drafts";

/// Flat key/value settings persisted as TOML.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub map: BTreeMap<String, String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("spotter").join("config"))
            .context("Could not determine config directory")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let content = toml::to_string(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to save config to {}", path.display()))
    }

    pub fn db_path(&self) -> &str {
        self.map.get(CONFIG_DB).map(String::as_str).unwrap_or(DEFAULT_DB)
    }

    pub fn drafts_dir(&self) -> PathBuf {
        PathBuf::from(
            self.map
                .get(CONFIG_DRAFTS)
                .map(String::as_str)
                .unwrap_or(DEFAULT_DRAFTS),
        )
    }

    pub fn user(&self) -> Option<&str> {
        self.map.get(CONFIG_USER).map(String::as_str)
    }
}

/// Program file layout accepted by `program create` and `program edit`.
#[derive(Debug, Deserialize)]
pub struct ProgramImport {
    pub title: Option<String>,
    pub goal: Option<String>,
    #[serde(default)]
    pub exercise: Vec<ExerciseSpec>,
}

/// Return the closest candidate for `input`
/// if similarity ≥ 0.80 *and* clearly better than the runner-up.
pub fn best_suggestion<'a>(input: &str, candidates: &'a [String]) -> Option<&'a str> {
    let inp = input.to_lowercase();
    if inp.trim().is_empty() {
        return None;
    }

    let mut scores: Vec<(&'a str, f64)> = candidates
        .iter()
        .map(|c| (c.as_str(), jaro_winkler(&inp, &c.to_lowercase())))
        .collect();

    // Highest score first.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = *scores.first()?;
    let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best)
    } else {
        None
    }
}
