// In-memory transport for exercising the services without hardware
use crate::application::serial_transport::{InboundSink, SerialLink, SerialTransport};
use crate::domain::connection::LinkSettings;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const CLOSE_MARKER: &str = "<close>";

#[derive(Default)]
pub struct MockLink {
    log: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
    write_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl MockLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock() = delay;
    }

    /// Lines written so far, in wire order
    pub fn written(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|entry| entry.as_str() != CLOSE_MARKER)
            .cloned()
            .collect()
    }

    /// Writes and the close, in the order they happened
    pub fn operations(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count(&self, line: &str) -> usize {
        self.log.lock().iter().filter(|entry| *entry == line).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SerialLink for MockLink {
    async fn write_all(&self, bytes: &[u8]) -> anyhow::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            anyhow::bail!("write after close");
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("device reports I/O error");
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.write_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.log.lock().push(String::from_utf8_lossy(bytes).to_string());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.log.lock().push(CLOSE_MARKER.to_string());
        Ok(())
    }
}

pub struct MockTransport {
    ports: Vec<String>,
    refuse_open: AtomicBool,
    fail_enumeration: AtomicBool,
    opens: AtomicUsize,
    open_delay: Mutex<Duration>,
    link: Mutex<Option<Arc<MockLink>>>,
    inbound: Mutex<Option<InboundSink>>,
}

impl MockTransport {
    pub fn new(ports: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            ports: ports.iter().map(|p| p.to_string()).collect(),
            refuse_open: AtomicBool::new(false),
            fail_enumeration: AtomicBool::new(false),
            opens: AtomicUsize::new(0),
            open_delay: Mutex::new(Duration::ZERO),
            link: Mutex::new(None),
            inbound: Mutex::new(None),
        })
    }

    pub fn refuse_open(&self, refuse: bool) {
        self.refuse_open.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    /// Make every open stall this long before completing
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock() = delay;
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Link handed out by the most recent successful open
    pub fn link(&self) -> Arc<MockLink> {
        self.link
            .lock()
            .clone()
            .expect("no port has been opened")
    }

    /// Deliver bytes as if they had just been read from the port
    pub fn inject(&self, bytes: &[u8]) -> bool {
        match self.inbound.lock().as_ref() {
            Some(sink) => sink.send(Bytes::copy_from_slice(bytes)).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl SerialTransport for MockTransport {
    fn available_ports(&self) -> anyhow::Result<Vec<String>> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            anyhow::bail!("enumeration not supported");
        }
        Ok(self.ports.clone())
    }

    async fn open(
        &self,
        port: &str,
        _settings: LinkSettings,
        inbound: InboundSink,
    ) -> anyhow::Result<Arc<dyn SerialLink>> {
        let delay = *self.open_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.refuse_open.load(Ordering::SeqCst) {
            anyhow::bail!("Access is denied");
        }
        if !self.ports.iter().any(|p| p == port) {
            anyhow::bail!("No such file or directory");
        }

        let link = MockLink::new();
        *self.link.lock() = Some(link.clone());
        *self.inbound.lock() = Some(inbound);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(link)
    }
}
