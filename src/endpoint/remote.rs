use tracing::debug;

use crate::endpoint::Endpoint;
use crate::protocol::{self, Request, Response};
use crate::scanner::Entry;
use crate::transport::Connection;
use crate::{Result, SnapSyncError};

/// Endpoint reached over a byte connection to a remote agent process.
///
/// The remote side keeps its own digest cache; only snapshot roots cross
/// the wire.
pub struct RemoteEndpoint<C: Connection> {
    connection: C,
}

impl<C: Connection> RemoteEndpoint<C> {
    /// Performs the Hello and Initialize exchanges and returns the ready
    /// endpoint.
    pub fn connect(
        mut connection: C,
        session: &str,
        version: u32,
        root: &str,
        ignores: &[String],
        alpha: bool,
    ) -> Result<Self> {
        protocol::write_message(&mut connection, &Request::Hello { version })?;
        match protocol::read_message(&mut connection)? {
            Response::Hello { version: remote } if remote == version => {
                debug!(version = remote, "endpoint protocol version agreed");
            }
            Response::Hello { version: remote } => {
                return Err(SnapSyncError::Protocol(format!(
                    "protocol version mismatch: local {}, remote {}",
                    version, remote
                )));
            }
            response => return Err(unexpected("Hello", &response)),
        }

        protocol::write_message(
            &mut connection,
            &Request::Initialize {
                session: session.to_owned(),
                root: root.to_owned(),
                ignores: ignores.to_vec(),
                alpha,
            },
        )?;
        match protocol::read_message(&mut connection)? {
            Response::Ok => Ok(Self { connection }),
            Response::Error { message } => Err(SnapSyncError::RemoteCommand(message)),
            response => Err(unexpected("Initialize", &response)),
        }
    }
}

impl<C: Connection> Endpoint for RemoteEndpoint<C> {
    fn scan(&mut self) -> Result<Option<Entry>> {
        protocol::write_message(&mut self.connection, &Request::Scan)?;
        match protocol::read_message(&mut self.connection)? {
            Response::Snapshot { root } => Ok(root),
            Response::Error { message } => Err(SnapSyncError::RemoteCommand(message)),
            response => Err(unexpected("Scan", &response)),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.connection.close()
    }
}

fn unexpected(request: &str, response: &Response) -> SnapSyncError {
    SnapSyncError::Protocol(format!(
        "unexpected response for {}: {:?}",
        request, response
    ))
}
