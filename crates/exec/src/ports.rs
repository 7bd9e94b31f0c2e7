//! Numbered log-forwarding ports written by running jobs.
//!
//! Each port is a bounded channel with exactly one reader. Readers suspend
//! on an empty port until the next write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::warn;

use hgw_model::HgwError;

/// Written by jobs that have nothing to report; never forwarded.
pub const NULL_PORT_DATA: &str = "NULL PORT DATA";

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogPort {
    Trace = 1,
    Debug = 2,
    Info = 3,
}

impl LogPort {
    pub const ALL: [LogPort; 3] = [LogPort::Trace, LogPort::Debug, LogPort::Info];

    pub fn id(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for LogPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port-{}", self.id())
    }
}

pub struct LogPorts {
    senders: HashMap<LogPort, mpsc::Sender<String>>,
    receivers: Mutex<HashMap<LogPort, mpsc::Receiver<String>>>,
}

impl LogPorts {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for port in LogPort::ALL {
            let (tx, rx) = mpsc::channel(capacity);
            senders.insert(port, tx);
            receivers.insert(port, rx);
        }
        Self {
            senders,
            receivers: Mutex::new(receivers),
        }
    }

    /// Write without blocking. A full port drops the message.
    pub fn write(&self, port: LogPort, data: impl Into<String>) -> bool {
        let Some(tx) = self.senders.get(&port) else {
            return false;
        };
        match tx.try_send(data.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%port, "log port full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Take the single reader of a port. Fails if already taken.
    pub fn reader(&self, port: LogPort) -> Result<PortReader, HgwError> {
        let mut receivers = self
            .receivers
            .lock()
            .map_err(|e| HgwError::Agent(format!("log port lock poisoned: {}", e)))?;
        let rx = receivers
            .remove(&port)
            .ok_or_else(|| HgwError::Agent(format!("{} already has a reader", port)))?;
        Ok(PortReader { port, rx })
    }
}

impl Default for LogPorts {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PortReader {
    port: LogPort,
    rx: mpsc::Receiver<String>,
}

impl PortReader {
    pub fn port(&self) -> LogPort {
        self.port
    }

    /// Next real message. `None` once every writer is gone.
    pub async fn next(&mut self) -> Option<String> {
        while let Some(data) = self.rx.recv().await {
            if data != NULL_PORT_DATA {
                return Some(data);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_skips_null_data() {
        let ports = LogPorts::new();
        let mut reader = ports.reader(LogPort::Debug).unwrap();
        assert!(ports.write(LogPort::Debug, NULL_PORT_DATA));
        assert!(ports.write(LogPort::Debug, "hello"));
        assert_eq!(reader.next().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn ports_are_independent() {
        let ports = LogPorts::new();
        let mut trace = ports.reader(LogPort::Trace).unwrap();
        let mut info = ports.reader(LogPort::Info).unwrap();
        ports.write(LogPort::Info, "info");
        ports.write(LogPort::Trace, "trace");
        assert_eq!(info.next().await.as_deref(), Some("info"));
        assert_eq!(trace.next().await.as_deref(), Some("trace"));
    }

    #[test]
    fn second_reader_is_rejected() {
        let ports = LogPorts::new();
        let _first = ports.reader(LogPort::Info).unwrap();
        assert!(ports.reader(LogPort::Info).is_err());
    }

    #[test]
    fn full_port_drops_messages() {
        let ports = LogPorts::with_capacity(1);
        assert!(ports.write(LogPort::Trace, "a"));
        assert!(!ports.write(LogPort::Trace, "b"));
    }

    #[test]
    fn port_ids() {
        assert_eq!(LogPort::Trace.id(), 1);
        assert_eq!(LogPort::Debug.id(), 2);
        assert_eq!(LogPort::Info.id(), 3);
    }
}
