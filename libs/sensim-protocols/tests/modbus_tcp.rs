//! Register front-end served over a local Modbus TCP socket

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use sensim_model::{PointDefinition, Registry};
use sensim_protocols::register::{decode_f32, encode_f32};
use sensim_protocols::{Frontend, ModbusTcpServer, RegisterBank, RegisterFrontend};
use sensim_routing::{RegisterEntry, RegisterMap, RegisterTable};

const T0: i64 = 1_700_000_000_000;

async fn request(stream: &mut TcpStream, tid: u16, pdu: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&tid.to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
    frame.push(1);
    frame.extend_from_slice(pdu);
    stream.write_all(&frame).await.unwrap();

    let mut header = [0u8; 7];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(u16::from_be_bytes([header[0], header[1]]), tid);
    let len = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut response = vec![0u8; len - 1];
    stream.read_exact(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn read_and_write_over_tcp() {
    let defs = vec![
        PointDefinition::analog("zone_temp", "C", 22.5, 0.0, 50.0).with_noise(0.0),
        PointDefinition::analog("setpoint", "C", 20.0, 10.0, 30.0)
            .with_writable(true)
            .with_noise(0.0),
    ];
    let registry = Arc::new(Registry::from_definitions(&defs, T0, 9));

    let mut map = RegisterMap::default();
    map.insert(RegisterTable::InputRegisters, 30_001, RegisterEntry::new("zone_temp"));
    map.insert(
        RegisterTable::HoldingRegisters,
        40_001,
        RegisterEntry::new("setpoint").writable(),
    );
    let map = Arc::new(map);
    let bank = Arc::new(RegisterBank::for_map(&map));
    let frontend = Arc::new(RegisterFrontend::new(registry.clone(), map, bank.clone()));
    frontend.tick().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let token = CancellationToken::new();
    let server = Arc::new(ModbusTcpServer::new(bank, frontend.clone()));
    let task = tokio::spawn(server.serve(listener, token.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();

    // FC04 read of the float slot
    let response = request(&mut stream, 1, &[0x04, 0x00, 0x00, 0x00, 0x02]).await;
    assert_eq!(response[..2], [0x04, 0x04]);
    let hi = u16::from_be_bytes([response[2], response[3]]);
    let lo = u16::from_be_bytes([response[4], response[5]]);
    assert_eq!(decode_f32([hi, lo]), 22.5);

    // FC16 write of a full slot
    let words = encode_f32(24.0);
    let mut pdu = vec![0x10, 0x00, 0x00, 0x00, 0x02, 0x04];
    for w in words {
        pdu.extend_from_slice(&w.to_be_bytes());
    }
    let response = request(&mut stream, 2, &pdu).await;
    assert_eq!(response, vec![0x10, 0x00, 0x00, 0x00, 0x02]);

    // FC06 covers half a slot
    let response = request(&mut stream, 3, &[0x06, 0x00, 0x00, 0x41, 0xC0]).await;
    assert_eq!(response, vec![0x86, 0x03]);

    registry.update_all(T0 + 1_000);
    frontend.tick().await.unwrap();
    let response = request(&mut stream, 4, &[0x03, 0x00, 0x00, 0x00, 0x02]).await;
    let hi = u16::from_be_bytes([response[2], response[3]]);
    let lo = u16::from_be_bytes([response[4], response[5]]);
    assert_eq!(decode_f32([hi, lo]), 24.0);

    token.cancel();
    task.await.unwrap();
}
