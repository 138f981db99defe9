// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process identity — who and where certificates are issued from.
//
// Resolution is best-effort by design: attestation must still work on a
// machine with no network route or an odd environment, so every lookup has
// a stable fallback constant rather than an error path.

use std::env;
use std::net::UdpSocket;

/// Fallback network identity when no local address can be resolved.
const LOOPBACK_FALLBACK: &str = "127.0.0.1";

/// Fallback machine name when the environment exposes none.
const UNKNOWN_HOST: &str = "scrubwerk-host";

/// The local machine's name, from the environment.
pub fn machine_name() -> String {
    env::var("HOSTNAME")
        .or_else(|_| env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| UNKNOWN_HOST.to_string())
}

/// Certificate subject in `operator@machine` form.
pub fn operator_identity() -> String {
    let operator = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "operator".to_string());
    format!("{operator}@{}", machine_name())
}

/// Best-effort local network address, as a string.
///
/// Connecting a UDP socket to a public resolver address selects the
/// outbound interface without sending a single packet; the socket's local
/// address is then the machine's LAN identity. Falls back to loopback when
/// there is no route.
pub fn network_identity() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| {
            s.connect("8.8.8.8:53")?;
            s.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| LOOPBACK_FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn network_identity_is_a_valid_address() {
        let identity = network_identity();
        assert!(
            identity.parse::<IpAddr>().is_ok(),
            "identity {identity:?} must parse as an IP address"
        );
    }

    #[test]
    fn operator_identity_has_subject_shape() {
        let subject = operator_identity();
        assert!(subject.contains('@'));
        let (operator, machine) = subject.split_once('@').expect("subject shape");
        assert!(!operator.is_empty());
        assert!(!machine.is_empty());
    }

    #[test]
    fn machine_name_is_nonempty() {
        assert!(!machine_name().is_empty());
    }
}
