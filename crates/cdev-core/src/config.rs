//! Device configuration.

use serde::{Deserialize, Serialize};

/// Default device identifier, as it would appear under `/dev`.
pub const DEFAULT_DEVICE_NAME: &str = "cdev";

/// Where a write places its data in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Always copy to byte 0, but still advance the session offset by the
    /// written count and extend the written length to that offset.
    ///
    /// Successive writes in one session therefore overwrite the head of the
    /// buffer while the written length keeps growing.
    #[default]
    Rewind,

    /// Copy to the session offset, like a regular file.
    Positional,
}

/// Configuration for a [`Device`](crate::Device).
///
/// The buffer capacity is not configurable; see
/// [`BUFFER_CAPACITY`](crate::BUFFER_CAPACITY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device identifier used in log lines and error messages.
    pub name: String,
    /// Write placement policy.
    pub write_mode: WriteMode,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { name: DEFAULT_DEVICE_NAME.to_string(), write_mode: WriteMode::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.name, "cdev");
        assert_eq!(config.write_mode, WriteMode::Rewind);
    }

    #[test]
    fn config_survives_cbor() {
        let config = DeviceConfig { name: "scratch".to_string(), write_mode: WriteMode::Positional };

        let mut buf = Vec::new();
        ciborium::into_writer(&config, &mut buf).unwrap();
        let decoded: DeviceConfig = ciborium::from_reader(buf.as_slice()).unwrap();

        assert_eq!(decoded, config);
    }
}
