// crates/livecut-media/src/devices.rs
//
// Device enumeration for `livecut --list-devices`: microphones and speakers
// via cpal, cameras via the nokhwa backend query.

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use nokhwa::utils::ApiBackend;

#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub index: u32,
    pub name:  String,
}

pub fn list_microphones() -> Result<Vec<DeviceEntry>> {
    let host = cpal::default_host();
    let devices = host.input_devices()?;
    Ok(enumerate(devices))
}

pub fn list_speakers() -> Result<Vec<DeviceEntry>> {
    let host = cpal::default_host();
    let devices = host.output_devices()?;
    Ok(enumerate(devices))
}

pub fn list_cameras() -> Result<Vec<DeviceEntry>> {
    let cameras = nokhwa::query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .enumerate()
        .map(|(i, info)| DeviceEntry {
            index: i as u32,
            name:  info.human_name(),
        })
        .collect())
}

fn enumerate(devices: impl Iterator<Item = cpal::Device>) -> Vec<DeviceEntry> {
    devices
        .enumerate()
        .map(|(i, d)| DeviceEntry {
            index: i as u32,
            name:  d.name().unwrap_or_else(|_| format!("device {i}")),
        })
        .collect()
}

/// Print every device table to stderr, one line per device.
pub fn print_all() {
    match list_microphones() {
        Ok(mics) => {
            eprintln!("[devices] microphones:");
            for m in mics {
                eprintln!("[devices]   {} — {}", m.index, m.name);
            }
        }
        Err(e) => eprintln!("[devices] microphone query failed: {e}"),
    }
    match list_speakers() {
        Ok(outs) => {
            eprintln!("[devices] speakers:");
            for o in outs {
                eprintln!("[devices]   {} — {}", o.index, o.name);
            }
        }
        Err(e) => eprintln!("[devices] speaker query failed: {e}"),
    }
    match list_cameras() {
        Ok(cams) => {
            eprintln!("[devices] cameras:");
            for c in cams {
                eprintln!("[devices]   {} — {}", c.index, c.name);
            }
        }
        Err(e) => eprintln!("[devices] camera query failed: {e}"),
    }
}
