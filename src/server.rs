use std::io::{self, ErrorKind, Read, Write};
use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::protocol::{read_message, write_message, Request, Response, PROTOCOL_VERSION};
use crate::scanner::{self, Blake3Hasher, Cache, SymlinkMode};
use crate::{Result, SnapSyncError};

/// Server side of the endpoint protocol.
///
/// Speaks length-prefixed frames over any byte stream; `run_stdio` wires it
/// to stdin/stdout for agent mode, which is why logging must stay on stderr.
#[derive(Default)]
pub struct EndpointServer {
    state: Option<SessionState>,
    hasher: Blake3Hasher,
}

struct SessionState {
    session: String,
    root: PathBuf,
    ignores: Vec<String>,
    alpha: bool,
    cache: Cache,
}

impl EndpointServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_stdio(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(&mut stdin.lock(), &mut stdout.lock())
    }

    pub fn serve<R: Read, W: Write>(&mut self, reader: &mut R, writer: &mut W) -> Result<()> {
        loop {
            let request: Request = match read_message(reader) {
                Ok(request) => request,
                Err(SnapSyncError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    // Peer hung up cleanly.
                    return Ok(());
                }
                Err(e) => {
                    error!("endpoint read error: {}", e);
                    return Err(e);
                }
            };

            let response = self.handle(request);
            write_message(writer, &response)?;
        }
    }

    fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Hello { version } => {
                info!(version, "endpoint client connected");
                Response::Hello {
                    version: PROTOCOL_VERSION,
                }
            }
            Request::Initialize {
                session,
                root,
                ignores,
                alpha,
            } => {
                info!(session = %session, root = %root, alpha, "endpoint initialized");
                self.state = Some(SessionState {
                    session,
                    root: PathBuf::from(root),
                    ignores,
                    alpha,
                    cache: Cache::new(),
                });
                Response::Ok
            }
            Request::Scan => {
                let state = match self.state.as_mut() {
                    Some(state) => state,
                    None => {
                        return Response::Error {
                            message: "endpoint not initialized".into(),
                        }
                    }
                };
                debug!(session = %state.session, alpha = state.alpha, "scanning for remote");
                match scanner::scan(
                    &state.root,
                    &mut self.hasher,
                    Some(&state.cache),
                    &state.ignores,
                    SymlinkMode::Portable,
                    0,
                ) {
                    Ok((root, cache)) => {
                        state.cache = cache;
                        Response::Snapshot { root }
                    }
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                }
            }
        }
    }
}
