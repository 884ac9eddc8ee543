// src/settings.rs
use crate::drivers::{PlotterError, DEFAULT_MAX_POINTS, MAX_MAX_POINTS, MIN_MAX_POINTS};
use crate::types::DEFAULT_BAUD;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CSV_FILENAME: &str = "test";

/// Operator state that survives restarts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settings {
    pub port: String,
    pub baud: u32,
    pub max_points: usize,
    pub csv_filename: String,
    /// `None` means "write next to the working directory".
    pub csv_folder: Option<String>,
    pub csv_enabled: bool,
    pub checkbox_names: Vec<String>,
    pub checkbox_states: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud: DEFAULT_BAUD,
            max_points: DEFAULT_MAX_POINTS,
            csv_filename: DEFAULT_CSV_FILENAME.to_owned(),
            csv_folder: None,
            csv_enabled: true,
            checkbox_names: Vec::new(),
            checkbox_states: Vec::new(),
        }
    }
}

impl Settings {
    /// Where the CSV log for the next connection goes.
    pub fn csv_path(&self) -> PathBuf {
        let folder = match &self.csv_folder {
            Some(folder) if !folder.trim().is_empty() => PathBuf::from(folder),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let name = match self.csv_filename.trim() {
            "" => DEFAULT_CSV_FILENAME,
            name => name,
        };
        folder.join(format!("{name}.csv"))
    }

    // 逐个字段解析，坏掉的字段单独回退到默认值
    fn from_object(obj: &Map<String, Value>) -> Self {
        let defaults = Settings::default();
        let mut settings = Settings {
            port: field(obj, "port", defaults.port),
            baud: field(obj, "baud", defaults.baud),
            max_points: field(obj, "max_points", defaults.max_points),
            csv_filename: field(obj, "csv_filename", defaults.csv_filename),
            csv_folder: field(obj, "csv_folder", defaults.csv_folder),
            csv_enabled: field(obj, "csv_enabled", defaults.csv_enabled),
            checkbox_names: field(obj, "checkbox_names", defaults.checkbox_names),
            checkbox_states: field(obj, "checkbox_states", defaults.checkbox_states),
        };
        if !(MIN_MAX_POINTS..=MAX_MAX_POINTS).contains(&settings.max_points) {
            log::warn!(
                "settings: max_points {} out of range, using {}",
                settings.max_points,
                DEFAULT_MAX_POINTS
            );
            settings.max_points = DEFAULT_MAX_POINTS;
        }
        if settings.baud == 0 {
            settings.baud = DEFAULT_BAUD;
        }
        settings
    }
}

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, default: T) -> T {
    match obj.get(key) {
        None => default,
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("settings: ignoring bad value for {key}: {err}");
                default
            }
        },
    }
}

/// JSON file backed key/value store.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> PathBuf {
        PathBuf::from("data/serial_plotter.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings; anything missing or unreadable falls back to defaults.
    pub fn load(&self) -> Settings {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                log::info!("no saved settings at {} ({err})", self.path.display());
                return Settings::default();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(obj)) => Settings::from_object(&obj),
            Ok(_) => {
                log::warn!("settings file {} is not an object", self.path.display());
                Settings::default()
            }
            Err(err) => {
                log::warn!("settings file {} is corrupt: {err}", self.path.display());
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), PlotterError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PlotterError::Settings(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json).map_err(|e| PlotterError::Settings(e.to_string()))
    }

    /// Forget everything that was saved.
    pub fn clear(&self) -> Result<(), PlotterError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PlotterError::Settings(err.to_string())),
        }
    }
}
