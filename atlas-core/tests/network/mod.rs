// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for the cloud control channel

mod protocol_tests;

use std::time::Duration;

use atlas_core::network::{Registration, TransportConfig};

pub fn registration() -> Registration {
    Registration {
        hardware_id: "10000000abc12345".into(),
        device_id: "dev-uuid-1".into(),
        name: "Atlas-c12345".into(),
    }
}

/// Transport config with short, deterministic reconnect delays.
pub fn fast_config(server_url: &str) -> TransportConfig {
    TransportConfig {
        connect_timeout: Duration::from_secs(2),
        io_timeout: Duration::from_secs(2),
        reconnect_delay: Duration::from_millis(10),
        reconnect_delay_max: Duration::from_millis(40),
        randomization_factor: 0.0,
        ..TransportConfig::default().with_server_url(server_url)
    }
}
