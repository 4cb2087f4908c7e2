//! Front-end settings persisted between runs: the last used link only.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::link::{DataBitsOpt, LinkSettings, ParityOpt, StopBitsOpt};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBitsOpt,
    pub parity: ParityOpt,
    pub stop_bits: StopBitsOpt,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            port_name: "COM4".to_string(),
            baud_rate: 38400,
            data_bits: DataBitsOpt::Eight,
            parity: ParityOpt::None,
            stop_bits: StopBitsOpt::One,
        }
    }
}

impl AppSettings {
    /// `<config dir>/telemetry-monitor/settings.json`, falling back to the
    /// home directory, then the current directory.
    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        base.join("telemetry-monitor").join("settings.json")
    }

    /// `Ok(None)` when no settings were saved yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&s)?))
    }

    /// Like [`load`](Self::load) but never fails; problems are logged.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(s)) => s,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("settings load from {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Writes through a temp file so a crash never leaves half a file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;

        fs::write(&tmp, json.as_bytes())?;
        if path.exists() {
            let _ = fs::remove_file(path);
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            ..LinkSettings::new(self.port_name.clone(), self.baud_rate)
        }
    }

    pub fn from_link(link: &LinkSettings) -> Self {
        Self {
            port_name: link.port_name.clone(),
            baud_rate: link.baud_rate,
            data_bits: link.data_bits,
            parity: link.parity,
            stop_bits: link.stop_bits,
        }
    }
}
