//! Configuration management for the control surface
//!
//! Handles loading, parsing and validation of the YAML configuration file.
//! The surface wiring is fixed once at startup; there is no hot reload.

use crate::controls::{Behaviour, ButtonMode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

/// Strip controls (3 knobs + fader per strip) plus the master fader
pub const CONTINUOUS_CONTROL_COUNT: u8 = 33;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub midi: MidiConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
}

/// MIDI port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Case-insensitive substring of the input port name
    pub input_port: String,
    /// Case-insensitive substring of the output port name
    pub output_port: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

/// Controller layout and behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// MIDI channel of the controller (0-15)
    #[serde(default)]
    pub channel: u8,
    /// CC number of the first knob; the rest follow consecutively
    #[serde(default = "default_first_control")]
    pub first_control: u8,
    #[serde(default = "default_fader_behaviour")]
    pub fader_behaviour: Behaviour,
    #[serde(default)]
    pub knob_behaviour: Behaviour,
    /// Pick-up controls switch to jump once caught
    #[serde(default = "default_true")]
    pub latch_pick_up: bool,
    /// Mode of the mute, solo and rec buttons
    #[serde(default = "default_strip_button_mode")]
    pub strip_button_mode: ButtonMode,
    /// Hold time before a timed-toggle press counts as momentary
    #[serde(default = "default_timed_toggle_ms")]
    pub timed_toggle_ms: u64,
    /// Velocity used to light a button LED
    #[serde(default = "default_led_on_velocity")]
    pub led_on_velocity: u8,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            first_control: default_first_control(),
            fader_behaviour: default_fader_behaviour(),
            knob_behaviour: Behaviour::default(),
            latch_pick_up: true,
            strip_button_mode: default_strip_button_mode(),
            timed_toggle_ms: default_timed_toggle_ms(),
            led_on_velocity: default_led_on_velocity(),
        }
    }
}

impl SurfaceConfig {
    pub fn timed_toggle_delay(&self) -> Duration {
        Duration::from_millis(self.timed_toggle_ms)
    }

    /// Validate ranges against the MIDI data limits
    pub fn validate(&self) -> Result<()> {
        if self.channel > 15 {
            anyhow::bail!("Surface channel {} is invalid (must be 0-15)", self.channel);
        }

        let last_control = u16::from(self.first_control) + u16::from(CONTINUOUS_CONTROL_COUNT) - 1;
        if last_control > 127 {
            anyhow::bail!(
                "first_control {} leaves no room for {} controls (last CC would be {})",
                self.first_control,
                CONTINUOUS_CONTROL_COUNT,
                last_control
            );
        }

        if self.led_on_velocity == 0 || self.led_on_velocity > 127 {
            anyhow::bail!(
                "led_on_velocity {} is invalid (must be 1-127)",
                self.led_on_velocity
            );
        }

        if self.timed_toggle_ms == 0 {
            anyhow::bail!("timed_toggle_ms must be greater than zero");
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.is_empty() {
            anyhow::bail!("MIDI input_port cannot be empty");
        }
        if self.midi.output_port.is_empty() {
            anyhow::bail!("MIDI output_port cannot be empty");
        }
        if self.midi.client_name.is_empty() {
            anyhow::bail!("MIDI client_name cannot be empty");
        }

        self.surface.validate().context("Invalid surface configuration")?;

        Ok(())
    }
}

// Default value functions
fn default_client_name() -> String { "digimix".to_string() }
fn default_first_control() -> u8 { 15 }
fn default_fader_behaviour() -> Behaviour { Behaviour::PickUp }
fn default_true() -> bool { true }
fn default_strip_button_mode() -> ButtonMode { ButtonMode::TimedToggle }
fn default_timed_toggle_ms() -> u64 { 500 }
fn default_led_on_velocity() -> u8 { 127 }
