//! Serial port device enumeration.

use log::info;
use serialport::{available_ports, SerialPortType};

/// Lists the serial devices present on the system, one line per device. USB
/// devices get their manufacturer and product appended when known.
pub fn list_ports() -> Vec<String> {
    match available_ports() {
        Ok(ports) => ports
            .into_iter()
            .map(|p| match p.port_type {
                // USB ports give us more info about the connected serial
                // controller
                SerialPortType::UsbPort(info) => format!(
                    "{} ({} / {})",
                    p.port_name,
                    info.manufacturer.as_deref().unwrap_or(""),
                    info.product.as_deref().unwrap_or("")
                ),
                _ => p.port_name,
            })
            .collect(),
        Err(ref e) => {
            info!("error while listing serial ports: {}", e);
            scan_dev()
        }
    }
}

/// Device node prefixes of the usual USB and on-board serial controllers.
#[cfg(unix)]
const TTY_PREFIXES: &[&str] = &["ttyUSB", "ttyACM", "ttyAMA", "ttyS", "cu.", "tty."];

/// Looks for serial device nodes under `/dev` when the system enumeration is
/// not available (e.g. built without udev support).
#[cfg(unix)]
fn scan_dev() -> Vec<String> {
    let mut found: Vec<String> = match std::fs::read_dir("/dev") {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| TTY_PREFIXES.iter().any(|p| name.starts_with(p)))
            .map(|name| format!("/dev/{}", name))
            .collect(),
        Err(ref e) => {
            info!("error while scanning /dev: {}", e);
            Vec::new()
        }
    };
    found.sort();
    found
}

#[cfg(not(unix))]
fn scan_dev() -> Vec<String> {
    Vec::new()
}

#[cfg(unix)]
#[test]
fn scan_only_reports_tty_nodes() {
    for port in scan_dev() {
        let name = port.trim_start_matches("/dev/");
        assert!(TTY_PREFIXES.iter().any(|p| name.starts_with(p)), "{}", port);
    }
}
