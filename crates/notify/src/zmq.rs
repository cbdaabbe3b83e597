//! ZeroMQ alert sink.
//!
//! Publishes on a PUB socket, either connected to a broker frontend or bound
//! for subscribers to connect to directly.

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use zeromq::prelude::*;
use zeromq::{PubSocket, ZmqMessage};

use crate::traits::{AlertSink, NotifyError};
use crate::transport::Transport;

/// ZeroMQ PUB socket sink.
///
/// Alerts are sent as two-frame ZMQ messages:
/// 1. Topic string (used by SUB sockets for prefix filtering)
/// 2. JSON-encoded alert payload
pub struct ZmqSink {
    socket: Mutex<PubSocket>,
}

impl ZmqSink {
    /// Connect to a broker frontend that forwards to subscribers.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn connect(transport: &Transport) -> Result<Self, NotifyError> {
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "connecting alert PUB socket to broker frontend");
        socket.connect(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }

    /// Bind the endpoint directly; subscribers connect to us.
    #[instrument(skip_all, fields(endpoint = %transport))]
    pub async fn bind(transport: &Transport) -> Result<Self, NotifyError> {
        transport
            .prepare_bind()
            .map_err(|e| NotifyError::Config(format!("cannot prepare IPC socket: {e}")))?;
        let mut socket = PubSocket::new();
        let endpoint = transport.endpoint();
        info!(endpoint = %endpoint, "binding alert PUB socket");
        socket.bind(&endpoint).await?;
        Ok(Self {
            socket: Mutex::new(socket),
        })
    }
}

fn alert_frames(topic: &str, payload: &str) -> ZmqMessage {
    let mut msg = ZmqMessage::from(topic);
    msg.push_back(payload.as_bytes().to_vec().into());
    msg
}

#[async_trait::async_trait]
impl AlertSink for ZmqSink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        let mut socket = self.socket.lock().await;
        socket.send(alert_frames(topic, payload)).await?;
        debug!(topic, "published alert frame");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "zmq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeromq::SubSocket;

    #[test]
    fn alert_is_two_frames() {
        let msg = alert_frames("alarms/process_control", r#"{"type":"ANOMALY_DETECTED"}"#);
        let frames: Vec<_> = msg.iter().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), b"alarms/process_control");
        assert_eq!(frames[1].as_ref(), br#"{"type":"ANOMALY_DETECTED"}"#);
    }

    #[tokio::test]
    async fn direct_pub_sub_roundtrip() {
        let transport = Transport::tcp("127.0.0.1", 15760);

        let sink = ZmqSink::bind(&transport).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut subscriber = SubSocket::new();
        subscriber.connect(&transport.endpoint()).await.unwrap();
        subscriber.subscribe("alarms/").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        sink.publish("alarms/process_control", r#"{"value":105.4}"#)
            .await
            .unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(2), subscriber.recv())
            .await
            .expect("timed out waiting for alert")
            .unwrap();

        let frames: Vec<_> = received.iter().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), b"alarms/process_control");
        assert_eq!(frames[1].as_ref(), br#"{"value":105.4}"#);
        assert_eq!(sink.sink_name(), "zmq");
    }

    #[tokio::test]
    async fn ipc_rebind_after_drop() {
        let transport = Transport::ipc("zmq-rebind-test");

        let first = ZmqSink::bind(&transport).await.unwrap();
        drop(first);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let second = ZmqSink::bind(&transport).await.unwrap();
        second.publish("alarms/process_control", "{}").await.unwrap();
    }
}
