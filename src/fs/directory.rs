//! Path normalization/resolution and directory-entry mutation.

use crate::config::{BLOCK_SIZE, DIRECT_BLOCKS, DIRENT_SIZE, ROOT_INODE};
use crate::disk::Disk;
use crate::error::{Error, Result};
use crate::fs::bitmap::BitmapAllocator;
use crate::fs::dirent::DirectoryEntry;
use crate::fs::inode::{FileType, Inode, InodeStore};

const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;

/// Path resolution and directory-entry operations.
///
/// Stateless: every function takes the disk and the inodes it needs to act
/// on, mirroring [`crate::fs::inode::InodeStore`].
pub struct DirectoryService;

impl DirectoryService {
	/// Normalizes `path` against `cwd`, honouring `.` and `..`, collapsing
	/// repeated/trailing slashes, and anchoring the result at `/`.
	pub fn normalize_path(path: &str, cwd: &str) -> String {
		let absolute = if path.starts_with('/') {
			path.to_string()
		} else {
			format!("{cwd}/{path}")
		};

		let mut stack: Vec<&str> = Vec::new();
		for component in absolute.split('/') {
			match component {
				"" | "." => {}
				".." => {
					stack.pop();
				}
				other => stack.push(other),
			}
		}

		if stack.is_empty() {
			"/".to_string()
		} else {
			format!("/{}", stack.join("/"))
		}
	}

	/// Splits a normalized absolute path into its parent directory and final
	/// component. Returns `("/", "")` for the root itself.
	pub fn split_path(path: &str) -> (String, String) {
		if path == "/" {
			return ("/".to_string(), String::new());
		}
		match path.rfind('/') {
			Some(0) => ("/".to_string(), path[1..].to_string()),
			Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
			None => ("/".to_string(), path.to_string()),
		}
	}

	/// Resolves `path` (relative to `cwd` if not absolute) to an inode number.
	pub fn lookup_path(disk: &mut Disk, path: &str, cwd: &str) -> Result<u32> {
		let normalized = Self::normalize_path(path, cwd);
		if normalized == "/" {
			return Ok(ROOT_INODE);
		}

		let mut current = ROOT_INODE;
		for component in normalized.trim_start_matches('/').split('/') {
			let inode = InodeStore::read_inode(disk, current)?;
			if inode.kind != FileType::Directory {
				return Err(Error::NotADirectory);
			}
			current = Self::lookup_in_directory(disk, current, component)?
				.ok_or(Error::NotFound)?;
		}
		Ok(current)
	}

	/// Looks up `name` inside the directory at `dir_inode`, returning its
	/// inode number if present.
	pub fn lookup_in_directory(
		disk: &mut Disk,
		dir_inode: u32,
		name: &str,
	) -> Result<Option<u32>> {
		let inode = InodeStore::read_inode(disk, dir_inode)?;
		for entry in Self::read_entries(disk, &inode)? {
			if entry.is_live() && entry.name == name {
				return Ok(Some(entry.inode_num));
			}
		}
		Ok(None)
	}

	/// Lists the live entries of the directory at `dir_inode`.
	pub fn list_directory(disk: &mut Disk, dir_inode: u32) -> Result<Vec<DirectoryEntry>> {
		let inode = InodeStore::read_inode(disk, dir_inode)?;
		if inode.kind != FileType::Directory {
			return Err(Error::NotADirectory);
		}
		Ok(Self::read_entries(disk, &inode)?
			.into_iter()
			.filter(DirectoryEntry::is_live)
			.collect())
	}

	/// Reads every directory-entry slot (live or tombstoned) across the
	/// directory's allocated data blocks.
	fn read_entries(disk: &mut Disk, inode: &Inode) -> Result<Vec<DirectoryEntry>> {
		let mut entries = Vec::new();
		for &block in &inode.direct_blocks[..inode.blocks_used as usize] {
			let mut buf = vec![0u8; BLOCK_SIZE];
			disk.read_block(block, &mut buf)?;
			for slot in 0..ENTRIES_PER_BLOCK {
				let off = slot * DIRENT_SIZE;
				entries.push(DirectoryEntry::from_bytes(&buf[off..off + DIRENT_SIZE]));
			}
		}
		Ok(entries)
	}

	/// Adds `(name, child_inode)` to the directory at `dir_inode`, allocating
	/// a new data block if no free (tombstoned) slot exists.
	pub fn add_directory_entry(
		disk: &mut Disk,
		bitmap: &mut BitmapAllocator,
		dir_inode: u32,
		name: &str,
		child_inode: u32,
	) -> Result<()> {
		let mut inode = InodeStore::read_inode(disk, dir_inode)?;
		if inode.kind != FileType::Directory {
			return Err(Error::NotADirectory);
		}
		let entry = DirectoryEntry::new(name, child_inode)?;

		if Self::lookup_in_directory(disk, dir_inode, name)?.is_some() {
			return Err(Error::Exists);
		}

		// Look for a free (tombstoned) slot in an already-allocated block.
		for i in 0..inode.blocks_used as usize {
			let block = inode.direct_blocks[i];
			let mut buf = vec![0u8; BLOCK_SIZE];
			disk.read_block(block, &mut buf)?;
			for slot in 0..ENTRIES_PER_BLOCK {
				let off = slot * DIRENT_SIZE;
				let existing = DirectoryEntry::from_bytes(&buf[off..off + DIRENT_SIZE]);
				if !existing.is_live() {
					buf[off..off + DIRENT_SIZE].copy_from_slice(&entry.to_bytes());
					disk.write_block(block, &buf)?;
					inode.size += DIRENT_SIZE as u64;
					InodeStore::write_inode(disk, dir_inode, inode)?;
					return Ok(());
				}
			}
		}

		// No free slot: grow the directory by one block.
		if inode.blocks_used as usize >= DIRECT_BLOCKS {
			return Err(Error::NoSpace);
		}
		let new_block = bitmap.alloc_block();
		if new_block == crate::config::INVALID_BLOCK {
			return Err(Error::NoSpace);
		}
		let mut buf = vec![0u8; BLOCK_SIZE];
		buf[..DIRENT_SIZE].copy_from_slice(&entry.to_bytes());
		disk.write_block(new_block, &buf)?;

		inode.direct_blocks[inode.blocks_used as usize] = new_block;
		inode.blocks_used += 1;
		inode.size += DIRENT_SIZE as u64;
		InodeStore::write_inode(disk, dir_inode, inode)?;
		Ok(())
	}

	/// Removes `name` from the directory at `dir_inode` by tombstoning its
	/// slot. The directory is never compacted or shrunk in block count.
	pub fn remove_directory_entry(disk: &mut Disk, dir_inode: u32, name: &str) -> Result<()> {
		let mut inode = InodeStore::read_inode(disk, dir_inode)?;
		if inode.kind != FileType::Directory {
			return Err(Error::NotADirectory);
		}
		for i in 0..inode.blocks_used as usize {
			let block = inode.direct_blocks[i];
			let mut buf = vec![0u8; BLOCK_SIZE];
			disk.read_block(block, &mut buf)?;
			for slot in 0..ENTRIES_PER_BLOCK {
				let off = slot * DIRENT_SIZE;
				let existing = DirectoryEntry::from_bytes(&buf[off..off + DIRENT_SIZE]);
				if existing.is_live() && existing.name == name {
					buf[off..off + DIRENT_SIZE].copy_from_slice(&DirectoryEntry::tombstone().to_bytes());
					disk.write_block(block, &buf)?;
					inode.size = inode.size.saturating_sub(DIRENT_SIZE as u64);
					InodeStore::write_inode(disk, dir_inode, inode)?;
					return Ok(());
				}
			}
		}
		Err(Error::NotFound)
	}

	/// Creates a new directory at `path`, with `.` and `..` entries, rolling
	/// back any allocation made in this call on failure.
	pub fn create_directory(
		disk: &mut Disk,
		bitmap: &mut BitmapAllocator,
		path: &str,
		cwd: &str,
	) -> Result<u32> {
		let normalized = Self::normalize_path(path, cwd);
		let (parent_path, name) = Self::split_path(&normalized);
		if name.is_empty() {
			return Err(Error::Exists);
		}

		let parent_inode = Self::lookup_path(disk, &parent_path, cwd)?;
		let parent = InodeStore::read_inode(disk, parent_inode)?;
		if parent.kind != FileType::Directory {
			return Err(Error::NotADirectory);
		}
		if Self::lookup_in_directory(disk, parent_inode, &name)?.is_some() {
			return Err(Error::Exists);
		}

		let new_inode_num = bitmap.alloc_inode();
		if new_inode_num == crate::config::INVALID_INODE {
			return Err(Error::NoSpace);
		}
		let new_block = bitmap.alloc_block();
		if new_block == crate::config::INVALID_BLOCK {
			bitmap.free_inode(new_inode_num);
			return Err(Error::NoSpace);
		}

		let mut new_inode = Inode::new_directory();
		new_inode.direct_blocks[0] = new_block;
		new_inode.blocks_used = 1;
		new_inode.size = 2 * DIRENT_SIZE as u64;

		let mut buf = vec![0u8; BLOCK_SIZE];
		let dot = DirectoryEntry::new(".", new_inode_num)?;
		let dotdot = DirectoryEntry::new("..", parent_inode)?;
		buf[0..DIRENT_SIZE].copy_from_slice(&dot.to_bytes());
		buf[DIRENT_SIZE..2 * DIRENT_SIZE].copy_from_slice(&dotdot.to_bytes());

		if let Err(e) = disk.write_block(new_block, &buf) {
			bitmap.free_block(new_block);
			bitmap.free_inode(new_inode_num);
			return Err(e);
		}
		if let Err(e) = InodeStore::write_inode(disk, new_inode_num, new_inode) {
			bitmap.free_block(new_block);
			bitmap.free_inode(new_inode_num);
			return Err(e);
		}
		if let Err(e) =
			Self::add_directory_entry(disk, bitmap, parent_inode, &name, new_inode_num)
		{
			bitmap.free_block(new_block);
			bitmap.free_inode(new_inode_num);
			return Err(e);
		}

		Ok(new_inode_num)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn normalize_collapses_dots_and_slashes() {
		assert_eq!(DirectoryService::normalize_path("/a//b/./c/", "/"), "/a/b/c");
		assert_eq!(DirectoryService::normalize_path("..", "/a/b"), "/a");
		assert_eq!(DirectoryService::normalize_path("..", "/"), "/");
		assert_eq!(DirectoryService::normalize_path("../../x", "/a/b"), "/x");
	}

	#[test]
	fn normalize_resolves_relative_to_cwd() {
		assert_eq!(DirectoryService::normalize_path("c", "/a/b"), "/a/b/c");
	}

	#[test]
	fn split_path_separates_parent_and_name() {
		assert_eq!(
			DirectoryService::split_path("/a/b/c"),
			("/a/b".to_string(), "c".to_string())
		);
		assert_eq!(
			DirectoryService::split_path("/a"),
			("/".to_string(), "a".to_string())
		);
		assert_eq!(
			DirectoryService::split_path("/"),
			("/".to_string(), String::new())
		);
	}
}
