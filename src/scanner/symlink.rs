use std::str::FromStr;

use crate::{Result, SnapSyncError};

/// Symlink handling policy for a scan.
///
/// `Default` is a configuration placeholder only; callers must resolve it
/// before scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SymlinkMode {
    #[default]
    Default = 0,
    Ignore = 1,
    Portable = 2,
    PosixRaw = 3,
}

impl SymlinkMode {
    pub fn is_default(self) -> bool {
        self == SymlinkMode::Default
    }
}

impl FromStr for SymlinkMode {
    type Err = SnapSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ignore" => Ok(SymlinkMode::Ignore),
            "portable" => Ok(SymlinkMode::Portable),
            "posix-raw" => Ok(SymlinkMode::PosixRaw),
            _ => Err(SnapSyncError::InvalidSymlinkMode(s.to_owned())),
        }
    }
}

/// Validates a symlink target under the given mode, returning it unchanged.
///
/// Backslashes are rejected in every mode: they are ambiguous across
/// platforms even where POSIX would tolerate them.
pub fn normalize(link_path: &str, target: &str, mode: SymlinkMode) -> Result<String> {
    if target.is_empty() {
        return violation(link_path, "empty target");
    }
    if target.contains('\\') {
        return violation(link_path, "target contains backslash");
    }
    if target.contains('\0') {
        return violation(link_path, "target contains null byte");
    }

    match mode {
        SymlinkMode::PosixRaw => Ok(target.to_owned()),
        SymlinkMode::Portable => {
            if target.starts_with('/') {
                return violation(link_path, "target is absolute");
            }
            // Track directory depth relative to the link's parent; any dip
            // below it makes the link unportable.
            let mut depth: u32 = 0;
            for component in target.split('/') {
                match component {
                    "" | "." => {}
                    ".." => match depth.checked_sub(1) {
                        Some(d) => depth = d,
                        None => {
                            return violation(link_path, "target escapes containing directory")
                        }
                    },
                    _ => depth += 1,
                }
            }
            Ok(target.to_owned())
        }
        SymlinkMode::Default | SymlinkMode::Ignore => Err(SnapSyncError::UnresolvedSymlinkMode),
    }
}

fn violation(link_path: &str, reason: &'static str) -> Result<String> {
    Err(SnapSyncError::UnportableSymlink {
        path: link_path.to_owned(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portable_accepts_relative_targets() {
        assert_eq!(
            normalize("l", "file", SymlinkMode::Portable).unwrap(),
            "file"
        );
        assert_eq!(
            normalize("sub/l", "nested/file", SymlinkMode::Portable).unwrap(),
            "nested/file"
        );
    }

    #[test]
    fn portable_accepts_descend_then_ascend() {
        assert!(normalize("l", "a/../b", SymlinkMode::Portable).is_ok());
        assert!(normalize("l", "./a", SymlinkMode::Portable).is_ok());
    }

    #[test]
    fn portable_rejects_absolute() {
        assert!(normalize("l", "/etc/passwd", SymlinkMode::Portable).is_err());
    }

    #[test]
    fn portable_rejects_escape() {
        assert!(normalize("l", "..", SymlinkMode::Portable).is_err());
        assert!(normalize("l", "../sibling", SymlinkMode::Portable).is_err());
        assert!(normalize("l", "../../etc/passwd", SymlinkMode::Portable).is_err());
        assert!(normalize("l", "a/../../b", SymlinkMode::Portable).is_err());
    }

    #[test]
    fn backslash_rejected_in_every_mode() {
        assert!(normalize("l", "target\\path", SymlinkMode::Portable).is_err());
        assert!(normalize("l", "target\\path", SymlinkMode::PosixRaw).is_err());
    }

    #[test]
    fn empty_target_rejected() {
        assert!(normalize("l", "", SymlinkMode::Portable).is_err());
        assert!(normalize("l", "", SymlinkMode::PosixRaw).is_err());
    }

    #[test]
    fn posix_raw_accepts_absolute_and_escaping() {
        assert!(normalize("l", "/etc/passwd", SymlinkMode::PosixRaw).is_ok());
        assert!(normalize("l", "../../x", SymlinkMode::PosixRaw).is_ok());
    }

    #[test]
    fn unresolved_modes_rejected() {
        assert!(matches!(
            normalize("l", "x", SymlinkMode::Default),
            Err(SnapSyncError::UnresolvedSymlinkMode)
        ));
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("portable".parse::<SymlinkMode>().unwrap(), SymlinkMode::Portable);
        assert_eq!("ignore".parse::<SymlinkMode>().unwrap(), SymlinkMode::Ignore);
        assert_eq!("posix-raw".parse::<SymlinkMode>().unwrap(), SymlinkMode::PosixRaw);
        assert!("default".parse::<SymlinkMode>().is_err());
    }
}
