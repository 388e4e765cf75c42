/*
 *  config.rs
 *
 *  LyLEDs - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Application configuration - YAML file layered with CLI overrides
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::nodes::StripSettings;
use crate::strip::channel::Interface;
use crate::strip::traits::StripType;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub log_level: Option<String>, // e.g., "info" | "debug"
    /// render after every message regardless of the payload
    pub render_on_msg: Option<bool>,
    /// force the mock binding
    pub mock: Option<bool>,
    /// strip wiring & behavior
    pub strip: Option<StripConfig>,
}

/// Strip section; unset fields take the config node defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StripConfig {
    pub leds: Option<u32>,
    pub gpio: Option<u32>,
    pub interface: Option<Interface>,
    pub freq: Option<u32>,
    pub dma: Option<u32>,
    pub strip_type: Option<String>, // "WS2812" | "SK6812" | "SK6812W"
    pub brightness: Option<u8>,
    pub invert: Option<bool>,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn render_on_msg(&self) -> bool {
        self.render_on_msg.unwrap_or(false)
    }

    pub fn mock(&self) -> bool {
        self.mock.unwrap_or(false)
    }

    /// Effective strip settings with defaults filled in
    pub fn strip_settings(&self) -> StripSettings {
        let mut settings = StripSettings::default();
        if let Some(strip) = self.strip.as_ref() {
            settings.leds = strip.leds.unwrap_or(settings.leds);
            settings.gpio = strip.gpio.unwrap_or(settings.gpio);
            settings.interface = strip.interface.unwrap_or(settings.interface);
            settings.freq = strip.freq.unwrap_or(settings.freq);
            settings.dma = strip.dma.unwrap_or(settings.dma);
            settings.strip_type = strip.strip_type.clone().unwrap_or(settings.strip_type);
            settings.brightness = strip.brightness.unwrap_or(settings.brightness);
            settings.invert = strip.invert.unwrap_or(settings.invert);
        }
        settings
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "LyLEDs", version, about = "LyLEDs WS281x strip controller")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// use the mock binding even on supported hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub mock: bool,
    #[arg(long, action = ArgAction::Set)]
    pub render_on_msg: Option<bool>,
    #[arg(long)]
    pub leds: Option<u32>,
    #[arg(long)]
    pub gpio: Option<u32>,
    /// PWM | PCM | SPI
    #[arg(long)]
    pub interface: Option<Interface>,
    #[arg(long)]
    pub freq: Option<u32>,
    #[arg(long)]
    pub dma: Option<u32>,
    #[arg(long)]
    pub strip_type: Option<String>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long, action = ArgAction::Set)]
    pub invert: Option<bool>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, YAML and `cli`, then validate.
pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lyleds/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lyleds/config.yaml");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/lyleds.yaml");
        if p.exists() {
            return Some(p);
        }
    }
    // project local
    for candidate in &["lyleds.yaml", "config.yaml", "config/lyleds.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    dst.log_level = src.log_level.or(dst.log_level.take());
    dst.render_on_msg = src.render_on_msg.or(dst.render_on_msg.take());
    dst.mock = src.mock.or(dst.mock.take());
    // strip
    match (&mut dst.strip, src.strip) {
        (None, Some(c)) => dst.strip = Some(c),
        (Some(d), Some(s)) => merge_strip(d, s),
        _ => {}
    }
}

fn merge_strip(dst: &mut StripConfig, src: StripConfig) {
    dst.leds = src.leds.or(dst.leds.take());
    dst.gpio = src.gpio.or(dst.gpio.take());
    dst.interface = src.interface.or(dst.interface.take());
    dst.freq = src.freq.or(dst.freq.take());
    dst.dma = src.dma.or(dst.dma.take());
    dst.strip_type = src.strip_type.or(dst.strip_type.take());
    dst.brightness = src.brightness.or(dst.brightness.take());
    dst.invert = src.invert.or(dst.invert.take());
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() {
        cfg.log_level = cli.log_level.clone();
    }
    if cli.debug {
        cfg.log_level = Some("debug".into());
    }
    if cli.mock {
        cfg.mock = Some(true);
    }
    if cli.render_on_msg.is_some() {
        cfg.render_on_msg = cli.render_on_msg;
    }

    let overrides = StripConfig {
        leds: cli.leds,
        gpio: cli.gpio,
        interface: cli.interface,
        freq: cli.freq,
        dma: cli.dma,
        strip_type: cli.strip_type.clone(),
        brightness: cli.brightness,
        invert: cli.invert,
    };
    if overrides != StripConfig::default() {
        merge(cfg, Config { strip: Some(overrides), ..Default::default() });
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(level) = cfg.log_level.as_deref() {
        if level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Validation(format!("unknown log_level '{level}'")));
        }
    }
    if let Some(strip) = cfg.strip.as_ref() {
        if strip.leds == Some(0) {
            return Err(ConfigError::Validation("strip leds must be > 0".into()));
        }
        if strip.freq == Some(0) {
            return Err(ConfigError::Validation("strip freq must be > 0".into()));
        }
        if let Some(name) = strip.strip_type.as_deref() {
            if StripType::from_name(name).is_none() {
                return Err(ConfigError::Validation(format!(
                    "strip strip_type must be one of WS2812|SK6812|SK6812W, got '{name}'"
                )));
            }
        }
    }
    Ok(())
}
