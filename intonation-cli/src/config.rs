use std::path::{Path, PathBuf};

use serde::Deserialize;

use intonation_engine::realtime::OutputOptions;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default, Clone, Debug, PartialEq)]
struct AudioConfig {
    sample_rate: Option<u32>,
    channels: Option<u16>,
    gain: Option<f32>,
    device: Option<String>,
}

pub struct Config {
    audio: AudioConfig,
}

impl Config {
    /// Embedded defaults merged with the user's file, if any.
    pub fn load() -> Self {
        let mut user = None;
        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => user = Some((path, contents)),
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }
        Self::from_sources(DEFAULT_CONFIG, user.as_ref().map(|(p, c)| (p.as_path(), c.as_str())))
    }

    fn from_sources(default: &str, user: Option<(&Path, &str)>) -> Self {
        let mut base: ConfigFile = toml::from_str(default).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is malformed: {e}");
            ConfigFile::default()
        });

        if let Some((path, contents)) = user {
            match toml::from_str::<ConfigFile>(contents) {
                Ok(user) => merge_audio(&mut base.audio, user.audio),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            }
        }

        Config { audio: base.audio }
    }

    /// Output request for the audio device, before command-line overrides.
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            device_name: self.audio.device.clone(),
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            gain: self.audio.gain.unwrap_or(0.8).clamp(0.0, 1.0),
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("intonation"))
}

fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

fn merge_audio(base: &mut AudioConfig, user: AudioConfig) {
    if user.sample_rate.is_some() {
        base.sample_rate = user.sample_rate;
    }
    if user.channels.is_some() {
        base.channels = user.channels;
    }
    if user.gain.is_some() {
        base.gain = user.gain;
    }
    if user.device.is_some() {
        base.device = user.device;
    }
}
