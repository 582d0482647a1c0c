//! Fixed-geometry block I/O over a host file.
//!
//! A [`Disk`] is a thin facade: it knows nothing about superblocks, bitmaps
//! or inodes. It only guarantees that block `id` always reads back the last
//! `BLOCK_SIZE` bytes written to it, and that out-of-range ids fail without
//! touching the caller's buffer.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::{BLOCK_SIZE, TOTAL_BLOCKS};
use crate::error::{Error, Result};

/// A block-addressable disk backed by a host file.
pub struct Disk {
	file: File,
	num_blocks: usize,
	block_size: usize,
}

impl Disk {
	/// Opens the disk image at `path`, creating and zero-filling it to the
	/// full geometry if it is absent or smaller than expected.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::open_with_geometry(path, TOTAL_BLOCKS, BLOCK_SIZE)
	}

	/// Like [`Disk::open`] but with an explicit geometry, mainly for tests.
	pub fn open_with_geometry<P: AsRef<Path>>(
		path: P,
		num_blocks: usize,
		block_size: usize,
	) -> Result<Self> {
		let path = path.as_ref();
		let expected_len = (num_blocks * block_size) as u64;

		let needs_init = match std::fs::metadata(path) {
			Ok(meta) => meta.len() < expected_len,
			Err(_) => true,
		};

		let mut file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.open(path)?;

		if needs_init {
			file.set_len(0)?;
			file.seek(SeekFrom::Start(0))?;
			let zero_block = vec![0u8; block_size];
			for _ in 0..num_blocks {
				file.write_all(&zero_block)?;
			}
			file.flush()?;
		}

		Ok(Self {
			file,
			num_blocks,
			block_size,
		})
	}

	/// Number of blocks on the disk.
	pub fn num_blocks(&self) -> usize {
		self.num_blocks
	}

	/// Size in bytes of one block.
	pub fn block_size(&self) -> usize {
		self.block_size
	}

	/// Reads block `id` into `out`, which must be exactly `block_size()` bytes.
	pub fn read_block(&mut self, id: u32, out: &mut [u8]) -> Result<()> {
		self.check_bounds(id, out.len())?;
		self.file.seek(SeekFrom::Start(self.offset_of(id)))?;
		self.file.read_exact(out)?;
		Ok(())
	}

	/// Writes `in_buf` (exactly `block_size()` bytes) to block `id`.
	pub fn write_block(&mut self, id: u32, in_buf: &[u8]) -> Result<()> {
		self.check_bounds(id, in_buf.len())?;
		self.file.seek(SeekFrom::Start(self.offset_of(id)))?;
		self.file.write_all(in_buf)?;
		Ok(())
	}

	fn offset_of(&self, id: u32) -> u64 {
		id as u64 * self.block_size as u64
	}

	fn check_bounds(&self, id: u32, buf_len: usize) -> Result<()> {
		if id as usize >= self.num_blocks {
			eprintln!("[Disk] out-of-range block id={id} (total={})", self.num_blocks);
			return Err(Error::IoFailure(std::io::Error::new(
				std::io::ErrorKind::InvalidInput,
				"block id out of range",
			)));
		}
		if buf_len != self.block_size {
			eprintln!(
				"[Disk] buffer size {buf_len} does not match block size {}",
				self.block_size
			);
			return Err(Error::IoFailure(std::io::Error::new(
				std::io::ErrorKind::InvalidInput,
				"buffer size mismatch",
			)));
		}
		Ok(())
	}
}

impl Drop for Disk {
	fn drop(&mut self) {
		let _ = self.file.flush();
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	static COUNTER: AtomicU32 = AtomicU32::new(0);

	fn temp_path(tag: &str) -> std::path::PathBuf {
		let n = COUNTER.fetch_add(1, Ordering::Relaxed);
		std::env::temp_dir().join(format!("tinix_disk_test_{tag}_{n}.img"))
	}

	#[test]
	fn creates_and_zero_fills() {
		let path = temp_path("create");
		{
			let mut disk = Disk::open_with_geometry(&path, 4, 16).unwrap();
			let mut buf = vec![0xffu8; 16];
			disk.read_block(0, &mut buf).unwrap();
			assert_eq!(buf, vec![0u8; 16]);
		}
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn write_then_read_round_trips() {
		let path = temp_path("roundtrip");
		{
			let mut disk = Disk::open_with_geometry(&path, 4, 16).unwrap();
			let data = vec![0x42u8; 16];
			disk.write_block(2, &data).unwrap();
			let mut out = vec![0u8; 16];
			disk.read_block(2, &mut out).unwrap();
			assert_eq!(out, data);
		}
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn reopen_preserves_contents() {
		let path = temp_path("reopen");
		{
			let mut disk = Disk::open_with_geometry(&path, 4, 16).unwrap();
			disk.write_block(1, &vec![0x7au8; 16]).unwrap();
		}
		{
			let mut disk = Disk::open_with_geometry(&path, 4, 16).unwrap();
			let mut out = vec![0u8; 16];
			disk.read_block(1, &mut out).unwrap();
			assert_eq!(out, vec![0x7au8; 16]);
		}
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn out_of_range_block_fails() {
		let path = temp_path("oob");
		{
			let mut disk = Disk::open_with_geometry(&path, 4, 16).unwrap();
			let mut buf = vec![0u8; 16];
			assert!(disk.read_block(4, &mut buf).is_err());
		}
		std::fs::remove_file(&path).unwrap();
	}
}
