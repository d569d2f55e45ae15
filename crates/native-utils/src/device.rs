use anyhow::{Context, Result};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Finds the output device called `device_name`, or the host default.
pub fn get_or_default_output(device_name: Option<&str>) -> Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_output_device()
            .context("No default output device");
    };

    for device in host.output_devices().context("Failed to list output devices")? {
        if device.name().is_ok_and(|name| name == target) {
            return Ok(device);
        }
    }
    Err(anyhow::anyhow!("No output device named {:?}", target))
}

/// One line per output device: name, channels, sample rate, default marker.
pub fn get_available_outputs() -> Result<String> {
    let host = get_host();
    let default_name = host
        .default_output_device()
        .and_then(|device| device.name().ok())
        .unwrap_or_default();

    let mut device_names = Vec::new();
    for device in host.output_devices().context("Failed to list output devices")? {
        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        let mut line = match device.default_output_config() {
            Ok(cfg) => format!(" * {}({}ch, {}hz)", name, cfg.channels(), cfg.sample_rate().0),
            Err(_) => format!(" * {}(no default config)", name),
        };
        if name == default_name {
            line.push_str(" [default]");
        }
        device_names.push(line);
    }
    Ok(device_names.join("\n"))
}
