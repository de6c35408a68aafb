use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::scanner::Entry;
use crate::Result;

/// Version of the endpoint wire protocol. Both sides must agree during the
/// Hello exchange.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    /// Handshake / version check.
    Hello { version: u32 },

    /// Bind the endpoint to one side of a session.
    Initialize {
        session: String,
        root: String,
        ignores: Vec<String>,
        alpha: bool,
    },

    /// Snapshot the endpoint's root.
    Scan,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    /// Generic ack.
    Ok,

    /// Handshake ack.
    Hello { version: u32 },

    /// Snapshot root; `None` when the root does not exist.
    Snapshot { root: Option<Entry> },

    /// Request-level failure.
    Error { message: String },
}

/// Writes a length-prefixed bincode frame (4-byte big-endian length).
pub fn write_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let data = bincode::serialize(message)
        .map_err(|e| crate::SnapSyncError::Protocol(format!("serialize error: {}", e)))?;
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

/// Reads one length-prefixed bincode frame.
pub fn read_message<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    bincode::deserialize(&buf)
        .map_err(|e| crate::SnapSyncError::Protocol(format!("deserialize error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_round_trip() {
        let mut wire = Vec::new();
        write_message(
            &mut wire,
            &Request::Initialize {
                session: "s1".into(),
                root: "/tmp/root".into(),
                ignores: vec!["*.log".into()],
                alpha: true,
            },
        )
        .unwrap();
        write_message(&mut wire, &Request::Scan).unwrap();

        let mut cursor = Cursor::new(wire);
        match read_message::<_, Request>(&mut cursor).unwrap() {
            Request::Initialize {
                session,
                root,
                ignores,
                alpha,
            } => {
                assert_eq!(session, "s1");
                assert_eq!(root, "/tmp/root");
                assert_eq!(ignores, vec!["*.log".to_string()]);
                assert!(alpha);
            }
            other => panic!("unexpected request: {:?}", other),
        }
        assert!(matches!(
            read_message::<_, Request>(&mut cursor).unwrap(),
            Request::Scan
        ));
    }

    #[test]
    fn snapshot_response_round_trip() {
        let entry = Entry::File {
            executable: false,
            digest: vec![1, 2, 3],
        };
        let mut wire = Vec::new();
        write_message(&mut wire, &Response::Snapshot { root: Some(entry.clone()) }).unwrap();

        let mut cursor = Cursor::new(wire);
        match read_message::<_, Response>(&mut cursor).unwrap() {
            Response::Snapshot { root } => assert_eq!(root, Some(entry)),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
