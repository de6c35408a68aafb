use ssh2::{Channel, Session};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use tracing::debug;

use crate::transport::Connection;
use crate::url::Url;
use crate::{Result, SnapSyncError};

const DEFAULT_SSH_PORT: u16 = 22;

/// Role the remote agent process is launched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Serve the endpoint protocol over the channel's byte stream.
    Endpoint,
}

impl AgentMode {
    fn command(self) -> &'static str {
        match self {
            AgentMode::Endpoint => "snapsync --endpoint",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: Option<PathBuf>,
}

impl SshConfig {
    /// Builds a dialing configuration from a parsed SSH URL. Port 0 means
    /// unspecified and falls back to 22; an empty username falls back to the
    /// local login name.
    pub fn from_url(url: &Url) -> Self {
        let user = if url.username.is_empty() {
            std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_default()
        } else {
            url.username.clone()
        };
        Self {
            host: url.hostname.clone(),
            port: if url.port == 0 {
                DEFAULT_SSH_PORT
            } else {
                url.port
            },
            user,
            key_path: None,
        }
    }
}

pub struct SshConnection {
    session: Session,
    _tcp: TcpStream,
}

impl SshConnection {
    pub fn connect(config: &SshConfig) -> Result<Self> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).map_err(|e| {
            SnapSyncError::SshConnection(format!(
                "failed to connect to {}:{}: {}",
                config.host, config.port, e
            ))
        })?;

        let mut session =
            Session::new().map_err(|e| SnapSyncError::SshConnection(e.to_string()))?;
        session.set_tcp_stream(tcp.try_clone().map_err(SnapSyncError::Io)?);
        session
            .handshake()
            .map_err(|e| SnapSyncError::SshConnection(format!("handshake failed: {}", e)))?;

        authenticate(&session, config)?;

        Ok(Self { session, _tcp: tcp })
    }

    pub fn open_channel(&self) -> Result<Channel> {
        self.session
            .channel_session()
            .map_err(|e| SnapSyncError::SshConnection(format!("channel open failed: {}", e)))
    }
}

fn authenticate(session: &Session, config: &SshConfig) -> Result<()> {
    if let Some(key) = &config.key_path {
        session
            .userauth_pubkey_file(&config.user, None, key, None)
            .map_err(|e| SnapSyncError::Authentication(format!("key auth failed: {}", e)))?;
    } else if session.userauth_agent(&config.user).is_err() || !session.authenticated() {
        // Agent auth failed; fall back to the usual key locations.
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_default();
        let default_keys = [
            PathBuf::from(&home).join(".ssh/id_rsa"),
            PathBuf::from(&home).join(".ssh/id_ed25519"),
        ];
        for key in default_keys {
            if key.exists()
                && session
                    .userauth_pubkey_file(&config.user, None, &key, None)
                    .is_ok()
                && session.authenticated()
            {
                break;
            }
        }
    }

    if !session.authenticated() {
        return Err(SnapSyncError::Authentication(
            "authentication failed (agent and default keys tried)".into(),
        ));
    }
    Ok(())
}

/// Dials an SSH URL and launches the remote agent in the requested mode,
/// returning its exec channel as a bidirectional byte connection.
pub fn dial(url: &Url, mode: AgentMode) -> Result<AgentChannel> {
    let config = SshConfig::from_url(url);
    debug!(host = %config.host, port = config.port, "dialing SSH remote");
    let connection = SshConnection::connect(&config)?;

    let mut channel = connection.open_channel()?;
    channel
        .exec(mode.command())
        .map_err(|e| SnapSyncError::RemoteCommand(format!("failed to launch agent: {}", e)))?;

    Ok(AgentChannel {
        channel,
        _connection: connection,
    })
}

/// An agent subprocess reached over an SSH exec channel.
pub struct AgentChannel {
    channel: Channel,
    _connection: SshConnection,
}

impl Read for AgentChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

impl Write for AgentChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}

impl Connection for AgentChannel {
    fn close(&mut self) -> Result<()> {
        self.channel.send_eof().ok();
        self.channel
            .close()
            .map_err(|e| SnapSyncError::SshConnection(format!("channel close failed: {}", e)))?;
        self.channel.wait_close().ok();
        Ok(())
    }
}
