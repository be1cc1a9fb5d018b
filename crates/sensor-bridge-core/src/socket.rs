//! Data socket task.
//!
//! One task per connected sensor: connects to the hub's data socket, writes
//! the session id handshake, then forwards everything it reads to the
//! driver. The connection machine interprets the bytes; this task never
//! parses them.

use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::debug;

use sensor_bridge_types::SensorId;
use sensor_bridge_wire::encode_session_id;

use crate::bridge::BridgeEvent;
use crate::events::SocketEvent;

const READ_BUF_SIZE: usize = 4096;

pub(crate) async fn run_data_socket(
    path: PathBuf,
    sensor: SensorId,
    session_id: i32,
    token: u64,
    tx: mpsc::UnboundedSender<BridgeEvent>,
) {
    let send = |event: SocketEvent| {
        tx.send(BridgeEvent::Socket {
            sensor,
            token,
            event,
        })
    };

    let mut stream = match UnixStream::connect(&path).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = send(SocketEvent::Failed(format!("connect: {e}")));
            return;
        }
    };

    if let Err(e) = stream.write_all(&encode_session_id(session_id)).await {
        let _ = send(SocketEvent::Failed(format!("handshake write: {e}")));
        return;
    }
    debug!(%sensor, session_id, "data socket handshake written");
    if send(SocketEvent::Connected).is_err() {
        return;
    }

    let mut ack = [0_u8; 1];
    match stream.read(&mut ack).await {
        Ok(0) => {
            let _ = send(SocketEvent::Eof);
            return;
        }
        Ok(_) => {
            if send(SocketEvent::HandshakeAck(ack[0])).is_err() {
                return;
            }
        }
        Err(e) => {
            let _ = send(SocketEvent::Failed(format!("handshake read: {e}")));
            return;
        }
    }

    let mut buf = [0_u8; READ_BUF_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                let _ = send(SocketEvent::Eof);
                return;
            }
            Ok(n) => {
                if send(SocketEvent::Data(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = send(SocketEvent::Failed(format!("read: {e}")));
                return;
            }
        }
    }
}
