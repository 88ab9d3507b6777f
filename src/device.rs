//! MIDI transport for the controller
//!
//! Opens the input and output ports by name, forwards decoded messages to an
//! async channel and serialises outgoing LED updates.

use crate::config::MidiConfig;
use crate::midi::{format_hex, MidiMessage};
use crate::surface::IndicatorSink;
use anyhow::{Context, Result};
use colored::*;
use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

const EVENT_QUEUE_SIZE: usize = 1000;

/// Decoded message received from the controller
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub timestamp: Instant,
    pub message: MidiMessage,
}

/// Shared handle to the output port
///
/// Handed to the surface before the port is opened; sends fail until
/// [`MidiDevice::connect`] succeeds.
#[derive(Default)]
pub struct DeviceOutput {
    conn: Mutex<Option<MidiOutputConnection>>,
}

impl DeviceOutput {
    pub fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }
}

impl IndicatorSink for DeviceOutput {
    fn send(&self, message: MidiMessage) -> Result<()> {
        let data = message.encode();
        let mut conn = self.conn.lock();
        let conn = conn
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected to output port"))?;
        conn.send(&data).context("Failed to send MIDI message")?;
        trace!("Sent: {} | {}", format_hex(&data), message);
        Ok(())
    }
}

/// Input and output connections to one controller
pub struct MidiDevice {
    input_conn: Option<MidiInputConnection<()>>,
    output: Arc<DeviceOutput>,
    event_tx: mpsc::Sender<DeviceEvent>,
    event_rx: Option<mpsc::Receiver<DeviceEvent>>,
    input_port_name: String,
    output_port_name: String,
    client_name: String,
}

impl MidiDevice {
    pub fn new(config: &MidiConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        Self {
            input_conn: None,
            output: Arc::new(DeviceOutput::default()),
            event_tx,
            event_rx: Some(event_rx),
            input_port_name: config.input_port.clone(),
            output_port_name: config.output_port.clone(),
            client_name: config.client_name.clone(),
        }
    }

    /// List available MIDI input ports
    pub fn list_input_ports() -> Result<Vec<String>> {
        let midi_in = MidiInput::new("digimix-scanner")?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect())
    }

    /// List available MIDI output ports
    pub fn list_output_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new("digimix-scanner")?;
        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|port| midi_out.port_name(port).ok())
            .collect())
    }

    fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
        midi_in.ports().into_iter().find_map(|port| {
            let name = midi_in.port_name(&port).ok()?;
            port_matches(&name, pattern).then(|| {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                (port, name)
            })
        })
    }

    fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
        midi_out.ports().into_iter().find_map(|port| {
            let name = midi_out.port_name(&port).ok()?;
            port_matches(&name, pattern).then(|| {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                (port, name)
            })
        })
    }

    /// Open both ports, replacing any existing connections
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();

        info!(
            "Connecting to controller - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let midi_in = MidiInput::new(&format!("{}-input", self.client_name))
            .context("Failed to create MIDI input")?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, port_name) = Self::find_input_port(&midi_in, &self.input_port_name)
            .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", self.input_port_name))?;
        info!("Connecting to input port: {}", port_name);

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &in_port,
                &self.client_name,
                move |_timestamp, data, _| match MidiMessage::parse(data) {
                    Some(message) => {
                        let event = DeviceEvent {
                            timestamp: Instant::now(),
                            message,
                        };
                        if event_tx.try_send(event).is_err() {
                            warn!("Event queue full, dropping {}", format_hex(data));
                        }
                    }
                    None => trace!("Ignoring MIDI: {}", format_hex(data)),
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("Failed to connect to input port")?;
        self.input_conn = Some(input_conn);

        let midi_out = MidiOutput::new(&format!("{}-output", self.client_name))
            .context("Failed to create MIDI output")?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (out_port, port_name) = Self::find_output_port(&midi_out, &self.output_port_name)
            .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", self.output_port_name))?;
        info!("Connecting to output port: {}", port_name);

        let output_conn = midi_out
            .connect(&out_port, &self.client_name)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("Failed to connect to output port")?;
        *self.output.conn.lock() = Some(output_conn);

        info!("Controller connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        let was_connected = self.is_connected();
        self.input_conn = None;
        *self.output.conn.lock() = None;
        if was_connected {
            info!("Controller disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output.is_connected()
    }

    /// Output handle usable as LED sink
    pub fn output(&self) -> Arc<DeviceOutput> {
        Arc::clone(&self.output)
    }

    /// Take the event receiver (the run loop consumes it)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<DeviceEvent>> {
        self.event_rx.take()
    }
}

/// Case-insensitive substring match on a port name
fn port_matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Print available MIDI ports, marking those matching `config`
pub fn list_ports_formatted(config: Option<&MidiConfig>) {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let sections = [
        ("Input Ports:", MidiDevice::list_input_ports(), config.map(|c| c.input_port.as_str())),
        ("Output Ports:", MidiDevice::list_output_ports(), config.map(|c| c.output_port.as_str())),
    ];

    for (title, ports, pattern) in sections {
        println!("\n{}", title.bold());
        match ports {
            Ok(ports) if ports.is_empty() => println!("  {}", "No ports found".dimmed()),
            Ok(ports) => {
                for port in ports {
                    let marker = match pattern {
                        Some(p) if port_matches(&port, p) => "[CONFIGURED]".green(),
                        _ => "          ".normal(),
                    };
                    println!("  {} {}", marker, port);
                }
            }
            Err(e) => println!("  {} {}", "Failed to enumerate:".red(), e),
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_matches_case_insensitive() {
        assert!(port_matches("MIDI Mix:MIDI Mix MIDI 1 20:0", "midi mix"));
        assert!(port_matches("Akai MIDImix", "MIDIMIX"));
        assert!(!port_matches("X-Touch INT", "midi mix"));
    }

    #[test]
    fn test_unconnected_output_rejects_sends() {
        let output = DeviceOutput::default();
        assert!(!output.is_connected());

        let message = MidiMessage::NoteOn { channel: 0, note: 1, velocity: 127 };
        let err = output.send(message).unwrap_err();
        assert!(err.to_string().contains("Not connected"));
    }

    #[test]
    fn test_new_device_is_disconnected() {
        let config = MidiConfig {
            input_port: "in".to_string(),
            output_port: "out".to_string(),
            client_name: "test".to_string(),
        };
        let mut device = MidiDevice::new(&config);

        assert!(!device.is_connected());
        assert!(device.take_event_receiver().is_some());
        assert!(device.take_event_receiver().is_none());
        assert!(!device.output().is_connected());
    }
}
