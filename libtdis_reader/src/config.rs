use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ProcessorError};
use super::event::HitLayout;
use super::geometry::DetectorGeometry;
use super::table::TableOptions;
use super::window::EventWindow;

/// The representation written by a conversion, chosen by the output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Keyed table as comma-separated text
    Csv,
    /// Dense arrays in an HDF5 file
    Hdf5,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "h5" | "hdf5" => Some(Self::Hdf5),
            _ => None,
        }
    }
}

/// Structure representing the application configuration. Contains pathing, windowing, and
/// detector information.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub hit_layout: HitLayout,
    pub skip_events: usize,
    pub n_events: Option<usize>,
    pub pad_positions: bool,
    pub geometry: DetectorGeometry,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            summary_path: None,
            hit_layout: HitLayout::default(),
            skip_events: 0,
            n_events: None,
            pad_positions: false,
            geometry: DetectorGeometry::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;
        // The geometry block is validated as it is deserialized
        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        Ok(config)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        std::fs::write(config_path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn window(&self) -> EventWindow {
        EventWindow::new(self.skip_events, self.n_events)
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            pad_positions: self.pad_positions.then_some(self.geometry),
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat, ProcessorError> {
        OutputFormat::from_path(&self.output_path)
            .ok_or_else(|| ProcessorError::UnknownOutputFormat(self.output_path.clone()))
    }

    pub fn has_summary_path(&self) -> bool {
        self.summary_path.is_some()
    }
}
