// Per-platform permission profiles
//
// Resolved once when the gateway is built. Android 12 (API 31) split
// Bluetooth access into the "nearby devices" permissions; older releases
// gate BLE scanning behind location. iOS and desktop hosts grant access
// implicitly when the radio manager is first used.

use crate::types::{Permission, Platform};

/// First Android API level with BLUETOOTH_SCAN / BLUETOOTH_CONNECT
pub const ANDROID_NEARBY_DEVICES_API: u32 = 31;

const ANDROID_MODERN: &[Permission] = &[
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
    Permission::AccessFineLocation,
];

const ANDROID_LEGACY: &[Permission] = &[Permission::AccessFineLocation];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    /// Whether the OS lets the app prompt for permissions
    pub supports_prompting: bool,
    pub required_permissions: Vec<Permission>,
}

impl PlatformProfile {
    pub fn resolve(platform: Platform, api_level: Option<u32>) -> Self {
        match platform {
            Platform::Android => {
                // Unknown API level: ask for the modern set, the OS ignores what it doesn't know
                let modern = api_level.map_or(true, |level| level >= ANDROID_NEARBY_DEVICES_API);
                Self {
                    platform,
                    supports_prompting: true,
                    required_permissions: if modern { ANDROID_MODERN } else { ANDROID_LEGACY }.to_vec(),
                }
            }
            Platform::Ios | Platform::Desktop => Self {
                platform,
                supports_prompting: false,
                required_permissions: Vec::new(),
            },
        }
    }

    pub fn grants_implicitly(&self) -> bool {
        self.required_permissions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_modern_set() {
        let profile = PlatformProfile::resolve(Platform::Android, Some(33));
        assert!(profile.supports_prompting);
        assert_eq!(
            profile.required_permissions,
            vec![
                Permission::BluetoothScan,
                Permission::BluetoothConnect,
                Permission::AccessFineLocation
            ]
        );
    }

    #[test]
    fn test_android_legacy_set() {
        let profile = PlatformProfile::resolve(Platform::Android, Some(29));
        assert_eq!(profile.required_permissions, vec![Permission::AccessFineLocation]);
    }

    #[test]
    fn test_ios_is_implicit() {
        let profile = PlatformProfile::resolve(Platform::Ios, None);
        assert!(profile.grants_implicitly());
        assert!(!profile.supports_prompting);
    }
}
