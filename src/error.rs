//! The core error taxonomy.
//!
//! Every fallible core operation returns `Result<T, Error>`. No panics
//! escape the core on a caller-reachable path; the shell matches on
//! [`Error`] to print a one-line diagnostic.

use std::fmt;
use std::io;

/// A core operation failure.
#[derive(Debug)]
pub enum Error {
	/// A file-system operation was attempted before `mount`/`format`.
	NotMounted,
	/// `mount` found a superblock whose magic does not match [`crate::config::FS_MAGIC`].
	BadMagic,
	/// The underlying disk image could not be read or written.
	IoFailure(io::Error),
	/// The inode or data-block bitmap is exhausted.
	NoSpace,
	/// A path component could not be resolved.
	NotFound,
	/// Expected a directory, found a file.
	NotADirectory,
	/// Expected a file, found a directory.
	IsADirectory,
	/// A directory entry with that name already exists.
	Exists,
	/// A path component exceeds [`crate::config::NAME_MAX`].
	NameTooLong,
	/// No open-file entry for the given descriptor.
	BadFd,
	/// No device registered under the given id.
	UnknownDevice,
	/// `release` was attempted by a pid that is not the device's owner.
	NotOwner,
	/// A scheduler state-machine precondition was violated.
	BadState,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotMounted => write!(f, "file system is not mounted"),
			Self::BadMagic => write!(f, "superblock magic number mismatch"),
			Self::IoFailure(e) => write!(f, "disk I/O failure: {e}"),
			Self::NoSpace => write!(f, "no space left on device"),
			Self::NotFound => write!(f, "no such file or directory"),
			Self::NotADirectory => write!(f, "not a directory"),
			Self::IsADirectory => write!(f, "is a directory"),
			Self::Exists => write!(f, "file exists"),
			Self::NameTooLong => write!(f, "name too long"),
			Self::BadFd => write!(f, "bad file descriptor"),
			Self::UnknownDevice => write!(f, "unknown device"),
			Self::NotOwner => write!(f, "not the device owner"),
			Self::BadState => write!(f, "invalid process state for this operation"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::IoFailure(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::IoFailure(e)
	}
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;
