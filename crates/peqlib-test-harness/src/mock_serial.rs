//! Mock transport for deterministic testing of protocol handlers.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test JSON-line framing, binary
//! frame encoding, and response parsing without real hardware.
//!
//! # Example
//!
//! ```
//! use peqlib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the handler sends this request, return this response.
//! mock.expect(b"{\"Action\":\"Describe\"}\0", b"{\"Status\":true}\0");
//! let sent = mock.sent_log();
//! assert!(sent.is_empty());
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use peqlib_core::error::{Error, Result};
use peqlib_core::transport::{Transport, TransportReader, TransportWriter};

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to return when the matching request is received.
    response: Vec<u8>,
}

/// Shared view of everything written through a [`MockTransport`].
///
/// Stays readable after the transport has been boxed and handed to a
/// device.
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentLog {
    fn push(&self, data: &[u8]) {
        if let Ok(mut log) = self.0.lock() {
            log.push(data.to_vec());
        }
    }

    /// Each element is the byte slice from one `send()` call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|log| log.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State shared by the transport and its split halves.
#[derive(Debug)]
struct MockState {
    expectations: VecDeque<Expectation>,
    /// Bytes the device has sent that nobody has read yet.
    inbox: VecDeque<u8>,
    connected: bool,
}

/// A mock [`Transport`] for testing protocol handlers without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response is then queued for subsequent `receive()` calls.
///
/// If no expectation matches or the queue is exhausted, an error is returned.
/// Clones share state, which is how [`into_split`](Transport::into_split)
/// hands out halves that see the same expectations.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    /// Largest chunk returned by one `receive()`; `None` returns as much as
    /// fits in the caller's buffer.
    chunk_size: Option<usize>,
    /// Sleep for the full timeout when there is nothing to return, like a
    /// silent device would.
    stall_when_idle: bool,
    sent_log: SentLog,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                inbox: VecDeque::new(),
                connected: true,
            })),
            chunk_size: None,
            stall_when_idle: false,
            sent_log: SentLog::default(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> Result<R> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Protocol("mock transport state poisoned".into()))?;
        Ok(f(&mut state))
    }

    /// Add an expected request/response pair.
    ///
    /// An empty `response` simulates a device that never answers.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        let expectation = Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        };
        let _ = self.with_state(|state| state.expectations.push_back(expectation));
    }

    /// Queue bytes the device sent before any request, such as a reply
    /// that arrived after its request had already timed out.
    pub fn unsolicited(&mut self, data: &[u8]) {
        let _ = self.with_state(|state| state.inbox.extend(data));
    }

    /// Deliver responses at most `size` bytes at a time.
    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// When nothing is pending, make `receive()` wait out its timeout.
    pub fn stall_when_idle(mut self) -> Self {
        self.stall_when_idle = true;
        self
    }

    /// Handle to the log of sent data.
    pub fn sent_log(&self) -> SentLog {
        self.sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.with_state(|state| state.expectations.len()).unwrap_or(0)
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::TransportClosed`].
    pub fn set_connected(&mut self, connected: bool) {
        let _ = self.with_state(|state| state.connected = connected);
    }

    async fn send_bytes(&self, data: &[u8]) -> Result<()> {
        let sent_log = &self.sent_log;
        self.with_state(|state| {
            if !state.connected {
                return Err(Error::TransportClosed);
            }

            sent_log.push(data);

            let expectation = state.expectations.pop_front().ok_or_else(|| {
                Error::Protocol("no more expectations in mock transport".into())
            })?;
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:02X?}, got {:02X?}",
                    expectation.request, data
                )));
            }
            state.inbox.extend(expectation.response);
            Ok(())
        })?
    }

    async fn receive_bytes(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let limit = self.chunk_size.unwrap_or(usize::MAX);
        let received = self.with_state(|state| {
            if !state.connected {
                return Err(Error::TransportClosed);
            }
            let n = state.inbox.len().min(buf.len()).min(limit);
            for (slot, byte) in buf.iter_mut().zip(state.inbox.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        })??;

        if received > 0 {
            return Ok(received);
        }
        if self.stall_when_idle {
            tokio::time::sleep(timeout).await;
        }
        Err(Error::Timeout)
    }

    fn close_now(&self) -> Result<()> {
        self.with_state(|state| {
            state.connected = false;
            state.inbox.clear();
        })
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.send_bytes(data).await
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.receive_bytes(buf, timeout).await
    }

    async fn close(&mut self) -> Result<()> {
        self.close_now()
    }

    fn is_connected(&self) -> bool {
        self.with_state(|state| state.connected).unwrap_or(false)
    }

    fn into_split(self: Box<Self>) -> (Box<dyn TransportReader>, Box<dyn TransportWriter>) {
        (Box::new(MockReader((*self).clone())), Box::new(MockWriter(*self)))
    }
}

/// Read half handed out by [`MockTransport::into_split`].
struct MockReader(MockTransport);

/// Write half handed out by [`MockTransport::into_split`].
struct MockWriter(MockTransport);

#[async_trait]
impl TransportReader for MockReader {
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.0.receive_bytes(buf, timeout).await
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close_now()
    }
}

#[async_trait]
impl TransportWriter for MockWriter {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.0.send_bytes(data).await
    }

    async fn close(&mut self) -> Result<()> {
        self.0.close_now()
    }
}
