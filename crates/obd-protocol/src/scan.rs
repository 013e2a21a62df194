//! Adapter port discovery.

use std::path::Path;
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::{debug, warn};

/// Candidate adapter ports: bound RFCOMM devices first, then USB and
/// Bluetooth serial ports reported by the OS.
pub fn discover_ports() -> Vec<String> {
    let rfcomm = rfcomm_devices(Path::new("/dev"));
    let ports = match tokio_serial::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("Serial port enumeration failed: {}", e);
            Vec::new()
        }
    };

    let candidates = order_candidates(rfcomm, ports);
    debug!(?candidates, "Adapter port scan complete");
    candidates
}

/// `rfcommN` entries of `dev`, sorted
fn rfcomm_devices(dev: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dev) else {
        return Vec::new();
    };
    let mut devices: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("rfcomm"))
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();
    devices.sort();
    devices
}

/// Merge RFCOMM devices with enumerated ports, skipping on-board UARTs
/// (PCI/unknown) that never host an OBD adapter.
fn order_candidates(rfcomm: Vec<String>, ports: Vec<SerialPortInfo>) -> Vec<String> {
    let mut candidates = rfcomm;
    for info in ports {
        let adapter_like = matches!(
            info.port_type,
            SerialPortType::UsbPort(_) | SerialPortType::BluetoothPort
        );
        if adapter_like && !candidates.contains(&info.port_name) {
            candidates.push(info.port_name);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, port_type: SerialPortType) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type,
        }
    }

    #[test]
    fn rfcomm_first_and_deduplicated() {
        let candidates = order_candidates(
            vec!["/dev/rfcomm0".to_string()],
            vec![
                port("/dev/ttyS0", SerialPortType::PciPort),
                port("/dev/rfcomm0", SerialPortType::BluetoothPort),
                port("/dev/ttyAMA0", SerialPortType::Unknown),
                port("/dev/rfcomm1", SerialPortType::BluetoothPort),
            ],
        );
        assert_eq!(candidates, vec!["/dev/rfcomm0", "/dev/rfcomm1"]);
    }

    #[test]
    fn nothing_found() {
        assert!(order_candidates(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn rfcomm_scan_of_directory() {
        let dir = std::env::temp_dir().join(format!("obd-scan-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["rfcomm1", "rfcomm0", "ttyS0"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let devices = rfcomm_devices(&dir);
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(devices.len(), 2);
        assert!(devices[0].ends_with("rfcomm0"));
        assert!(devices[1].ends_with("rfcomm1"));
    }

    #[test]
    fn missing_directory_is_empty() {
        assert!(rfcomm_devices(Path::new("/nonexistent-obd-dev")).is_empty());
    }
}
