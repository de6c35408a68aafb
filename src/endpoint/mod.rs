use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub mod local;
pub mod remote;

pub use local::LocalEndpoint;
pub use remote::RemoteEndpoint;

use crate::scanner::Entry;
use crate::transport::ssh::{self, AgentMode};
use crate::url::{Protocol, Url};
use crate::{Result, SnapSyncError};

const RECONNECT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Caller-side handle to one side of a synchronization session.
pub trait Endpoint: Send {
    /// Snapshots the endpoint's root; `None` means the root does not exist.
    fn scan(&mut self) -> Result<Option<Entry>>;

    fn close(&mut self) -> Result<()>;
}

/// Creates an endpoint for a parsed URL: in-process for local URLs, over an
/// agent channel for SSH URLs. Custom protocols are rejected.
pub fn connect(
    session: &str,
    version: u32,
    url: &Url,
    ignores: &[String],
    alpha: bool,
) -> Result<Box<dyn Endpoint>> {
    match url.protocol {
        Protocol::Local => Ok(Box::new(LocalEndpoint::new(
            session, version, &url.path, ignores, alpha,
        )?)),
        Protocol::Ssh => {
            let connection = ssh::dial(url, AgentMode::Endpoint)?;
            let endpoint =
                RemoteEndpoint::connect(connection, session, version, &url.path, ignores, alpha)?;
            Ok(Box::new(endpoint))
        }
        Protocol::Custom => Err(SnapSyncError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unknown protocol: {}", url.protocol),
        }),
    }
}

/// Cancellable variant of `connect` for auto-reconnection.
///
/// The blocking dial runs on its own thread so the caller's cancellation
/// flag can abort the wait. An endpoint that materializes after cancellation
/// is closed on whichever side still holds it.
pub fn reconnect(
    cancel: &AtomicBool,
    session: &str,
    version: u32,
    url: &Url,
    ignores: &[String],
    alpha: bool,
) -> Result<Box<dyn Endpoint>> {
    let (results_tx, results) = mpsc::channel();
    {
        let session = session.to_owned();
        let url = url.clone();
        let ignores = ignores.to_vec();
        thread::spawn(move || {
            let result = connect(&session, version, &url, &ignores, alpha);
            if let Err(mpsc::SendError(undelivered)) = results_tx.send(result) {
                if let Ok(mut endpoint) = undelivered {
                    let _ = endpoint.close();
                }
            }
        });
    }

    loop {
        if cancel.load(Ordering::Acquire) {
            // An endpoint may have raced delivery against cancellation.
            if let Ok(Ok(mut endpoint)) = results.try_recv() {
                let _ = endpoint.close();
            }
            return Err(SnapSyncError::Cancelled);
        }
        match results.recv_timeout(RECONNECT_POLL_INTERVAL) {
            Ok(result) => return result,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(SnapSyncError::Protocol(
                    "connect worker terminated without a result".into(),
                ))
            }
        }
    }
}
