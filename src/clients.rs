//! Connected socket clients that receive each dispatch as a JSON line.
//!
//! Delivery is fire-and-forget. A client whose socket stays full past
//! [`WRITE_TIMEOUT`] is dropped, so a stalled reader never holds up the
//! gesture loop.

use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::info;

pub const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Clone, Default)]
pub struct ClientList {
    inner: Arc<Mutex<Vec<UnixStream>>>,
}

impl ClientList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. Its writes are bounded by [`WRITE_TIMEOUT`].
    pub fn add(&self, stream: UnixStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        self.lock().push(stream);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `line` plus a newline to every client, dropping any client whose
    /// write fails or times out. Returns how many clients remain.
    pub fn broadcast(&self, line: &str) -> usize {
        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        payload.push('\n');

        let mut clients = self.lock();
        clients.retain_mut(|stream| match stream.write_all(payload.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                info!("dropping client: {e}");
                false
            }
        });
        clients.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UnixStream>> {
        self.inner.lock().expect("client list lock poisoned")
    }
}
