// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mounted volume discovery for the control API's device listing.

use scrubwerk_core::VolumeInfo;

/// Best-effort listing of mounted volumes backed by real block devices.
///
/// Listing failures yield an empty list rather than an error — device
/// discovery is advisory, never load-bearing for an erase job.
#[cfg(unix)]
pub fn list_volumes() -> Vec<VolumeInfo> {
    let Ok(mounts) = std::fs::read_to_string("/proc/mounts") else {
        return Vec::new();
    };

    let mut volumes = Vec::new();
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let (Some(device), Some(mount_point)) = (fields.next(), fields.next()) else {
            continue;
        };
        // Pseudo-filesystems (proc, sysfs, tmpfs, cgroups...) have no
        // erasable backing device.
        if device.starts_with("/dev/") {
            volumes.push(VolumeInfo {
                device: device.to_string(),
                mount_point: decode_mount_escapes(mount_point),
            });
        }
    }
    volumes
}

#[cfg(windows)]
pub fn list_volumes() -> Vec<VolumeInfo> {
    let mut volumes = Vec::new();
    for letter in b'A'..=b'Z' {
        let root = format!("{}:\\", letter as char);
        if std::path::Path::new(&root).exists() {
            volumes.push(VolumeInfo {
                device: format!("{}:", letter as char),
                mount_point: root,
            });
        }
    }
    volumes
}

/// `/proc/mounts` escapes spaces, tabs, newlines, and backslashes as octal
/// (`\040` etc.).
#[cfg(unix)]
fn decode_mount_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = chars.clone().take(3).collect();
        if digits.len() == 3 {
            if let Ok(code) = u8::from_str_radix(&digits, 8) {
                out.push(code as char);
                chars.nth(2);
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn lists_only_real_devices() {
        for volume in list_volumes() {
            assert!(volume.device.starts_with("/dev/"));
            assert!(!volume.mount_point.is_empty());
        }
    }

    #[cfg(unix)]
    #[test]
    fn decodes_octal_escapes() {
        assert_eq!(decode_mount_escapes("/mnt/usb\\040drive"), "/mnt/usb drive");
        assert_eq!(decode_mount_escapes("/plain"), "/plain");
        assert_eq!(decode_mount_escapes("trailing\\"), "trailing\\");
    }
}
