//! Tests for Engine.IO and Socket.IO framing

use atlas_core::network::{
    decode_payload, encode_payload, EnginePacket, Handshake, SocketPacket,
};
use serde_json::json;
use std::time::Duration;

const OPEN: &str = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

#[test]
fn test_open_packet_handshake() {
    match EnginePacket::decode(OPEN).unwrap() {
        EnginePacket::Open(handshake) => {
            assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
            assert_eq!(handshake.upgrades, vec!["websocket"]);
            assert_eq!(handshake.liveness_window(), Duration::from_secs(45));
            assert_eq!(handshake.max_payload, Some(1_000_000));
        }
        other => panic!("unexpected packet: {:?}", other),
    }
}

#[test]
fn test_control_packets() {
    assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping);
    assert_eq!(EnginePacket::decode("3").unwrap(), EnginePacket::Pong);
    assert_eq!(EnginePacket::decode("1").unwrap(), EnginePacket::Close);
    assert_eq!(EnginePacket::decode("6").unwrap(), EnginePacket::Noop);
    assert_eq!(EnginePacket::Pong.encode(), "3");
    assert!(EnginePacket::decode("").is_err());
    assert!(EnginePacket::decode("9").is_err());
}

#[test]
fn test_payload_splits_on_record_separator() {
    let packets = decode_payload("40{\"sid\":\"s1\"}\u{1e}2\u{1e}42[\"deploy_playlist\",{}]").unwrap();
    assert_eq!(
        packets,
        vec![
            EnginePacket::Message(r#"0{"sid":"s1"}"#.into()),
            EnginePacket::Ping,
            EnginePacket::Message(r#"2["deploy_playlist",{}]"#.into()),
        ]
    );
}

#[test]
fn test_disconnect_payload() {
    let body = encode_payload(&[
        EnginePacket::Message(SocketPacket::Disconnect.encode()),
        EnginePacket::Close,
    ]);
    assert_eq!(body, "41\u{1e}1");
}

#[test]
fn test_open_packet_encodes_for_servers() {
    let handshake = Handshake {
        sid: "s1".into(),
        upgrades: vec![],
        ping_interval: 100,
        ping_timeout: 50,
        max_payload: None,
    };
    let text = EnginePacket::Open(handshake.clone()).encode();
    assert_eq!(EnginePacket::decode(&text).unwrap(), EnginePacket::Open(handshake));
}

#[test]
fn test_namespace_connect_and_ack() {
    assert_eq!(SocketPacket::Connect(None).encode(), "0");
    assert_eq!(
        SocketPacket::decode(r#"0{"sid":"abc"}"#).unwrap(),
        SocketPacket::Connect(Some(json!({ "sid": "abc" })))
    );
}

#[test]
fn test_connect_error_message() {
    assert_eq!(
        SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap(),
        SocketPacket::ConnectError("Not authorized".into())
    );
}

#[test]
fn test_event_with_ack_id() {
    assert_eq!(
        SocketPacket::decode(r#"212["registered",{"id":"p1"}]"#).unwrap(),
        SocketPacket::event("registered", json!({ "id": "p1" }))
    );
}

#[test]
fn test_event_without_payload_is_null() {
    assert_eq!(
        SocketPacket::decode(r#"2["reboot"]"#).unwrap(),
        SocketPacket::event("reboot", serde_json::Value::Null)
    );
}

#[test]
fn test_foreign_namespace_is_ignored() {
    assert_eq!(
        SocketPacket::decode(r#"2/admin,["deploy_playlist",{}]"#).unwrap(),
        SocketPacket::Other { kind: '2' }
    );
    assert_eq!(
        SocketPacket::decode(r#"2/,["deploy_playlist",{}]"#).unwrap(),
        SocketPacket::event("deploy_playlist", json!({}))
    );
}

#[test]
fn test_event_needs_a_name() {
    assert!(SocketPacket::decode("2[]").is_err());
    assert!(SocketPacket::decode("2[42]").is_err());
}
