//! Where the alert PUB socket lives.

use std::fmt;
use std::path::{Path, PathBuf};

use vigil_core::config::AlertConfig;

/// Directory holding IPC socket files.
pub const IPC_SOCKET_DIR: &str = "/tmp/vigil";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Unix domain socket `{IPC_SOCKET_DIR}/{name}.sock`, for a broker on
    /// the same host.
    Ipc(String),
    Tcp { host: String, port: u16 },
}

impl Transport {
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(name.to_string())
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// `ALERT_ZMQ_IPC` selects a local socket; otherwise host and port.
    pub fn for_alerts(alert: &AlertConfig) -> Self {
        match alert.zmq_ipc.as_deref() {
            Some(name) => Self::ipc(name),
            None => Self::tcp(alert.zmq_host.clone(), alert.zmq_port),
        }
    }

    fn socket_path(&self) -> Option<PathBuf> {
        match self {
            Self::Ipc(name) => Some(PathBuf::from(IPC_SOCKET_DIR).join(format!("{name}.sock"))),
            Self::Tcp { .. } => None,
        }
    }

    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(name) => format!("ipc://{IPC_SOCKET_DIR}/{name}.sock"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// Make an IPC endpoint bindable: create the socket directory and
    /// remove a socket file left behind by an earlier process. No-op for TCP.
    pub fn prepare_bind(&self) -> std::io::Result<()> {
        let Some(path) = self.socket_path() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        remove_stale_socket(&path)
    }
}

/// A `.sock` file outlives the PUB socket that created it and makes the
/// next bind fail with `EADDRINUSE`.
fn remove_stale_socket(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale alert socket");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint())
    }
}
