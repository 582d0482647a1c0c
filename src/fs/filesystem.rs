//! The file-system façade: superblock lifecycle, high-level file operations
//! and the open-file descriptor table.

use crate::config::{BLOCK_SIZE, DIRECT_BLOCKS, DISK_IMAGE_NAME, ROOT_INODE};
use crate::disk::Disk;
use crate::error::{Error, Result};
use crate::fs::bitmap::BitmapAllocator;
use crate::fs::dirent::DirectoryEntry;
use crate::fs::directory::DirectoryService;
use crate::fs::fd_table::FileDescriptorTable;
use crate::fs::inode::{FileType, Inode, InodeStore};
use crate::fs::superblock::SuperBlock;

/// Coordinates the disk, bitmaps, inode table and directory tree behind the
/// shell-facing file operations. All operations except [`FileSystem::format`]
/// and [`FileSystem::mount`] require [`FileSystem::is_mounted`].
pub struct FileSystem {
	disk: Disk,
	superblock: Option<SuperBlock>,
	bitmap: Option<BitmapAllocator>,
	fd_table: FileDescriptorTable,
	current_dir: String,
	mounted: bool,
}

impl FileSystem {
	/// Opens (creating if absent) the disk image at `path` and returns an
	/// unmounted façade over it.
	pub fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
		Ok(Self {
			disk: Disk::open(path)?,
			superblock: None,
			bitmap: None,
			fd_table: FileDescriptorTable::new(),
			current_dir: "/".to_string(),
			mounted: false,
		})
	}

	/// Opens the default disk image ([`DISK_IMAGE_NAME`]).
	pub fn new_default() -> Result<Self> {
		Self::new(DISK_IMAGE_NAME)
	}

	pub fn is_mounted(&self) -> bool {
		self.mounted
	}

	pub fn get_current_directory(&self) -> &str {
		&self.current_dir
	}

	/// Returns the current in-memory superblock, for `stat`/`df`-style
	/// shell introspection.
	pub fn superblock(&self) -> Result<&SuperBlock> {
		self.require_mounted()?;
		Ok(self.sb())
	}

	fn require_mounted(&self) -> Result<()> {
		if self.mounted {
			Ok(())
		} else {
			Err(Error::NotMounted)
		}
	}

	fn sb(&self) -> &SuperBlock {
		self.superblock.as_ref().expect("mounted filesystem has a superblock")
	}

	fn sb_mut(&mut self) -> &mut SuperBlock {
		self.superblock.as_mut().expect("mounted filesystem has a superblock")
	}

	fn bitmap_mut(&mut self) -> &mut BitmapAllocator {
		self.bitmap.as_mut().expect("mounted filesystem has a bitmap")
	}

	/// Overwrites the image with a fresh, empty file system.
	pub fn format(&mut self) -> Result<()> {
		eprintln!("[FS] formatting file system");

		let mut bitmap = BitmapAllocator::empty();
		bitmap.mark_inode_used(ROOT_INODE);

		let zero_block = vec![0u8; BLOCK_SIZE];
		for i in 0..crate::config::INODE_TABLE_BLOCKS as u32 {
			self.disk.write_block(crate::config::INODE_TABLE_START + i, &zero_block)?;
		}

		let root_block = bitmap.alloc_block();
		if root_block == crate::config::INVALID_BLOCK {
			eprintln!("[FS] format failed: unable to allocate root directory block");
			return Err(Error::NoSpace);
		}

		let mut root_inode = Inode::new_directory();
		root_inode.direct_blocks[0] = root_block;
		root_inode.blocks_used = 1;
		root_inode.size = 2 * crate::config::DIRENT_SIZE as u64;
		InodeStore::write_inode(&mut self.disk, ROOT_INODE, root_inode)?;

		let mut dir_block = vec![0u8; BLOCK_SIZE];
		let dot = DirectoryEntry::new(".", ROOT_INODE)?;
		let dotdot = DirectoryEntry::new("..", ROOT_INODE)?;
		let dirent_size = crate::config::DIRENT_SIZE;
		dir_block[0..dirent_size].copy_from_slice(&dot.to_bytes());
		dir_block[dirent_size..2 * dirent_size].copy_from_slice(&dotdot.to_bytes());
		self.disk.write_block(root_block, &dir_block)?;

		self.superblock = Some(SuperBlock::fresh(1));
		self.bitmap = Some(bitmap);
		self.current_dir = "/".to_string();
		self.fd_table = FileDescriptorTable::new();
		self.mounted = true;

		// `alloc_block` only touched the bitmap above; the root directory's
		// data block must still be reflected in the superblock's free_blocks
		// before either is persisted.
		self.sync_counters()?;
		let sb_block = self.sb().to_block();
		self.disk.write_block(crate::config::SUPERBLOCK_BLOCK, &sb_block)?;
		self.bitmap.as_mut().unwrap().save(&mut self.disk)?;

		eprintln!(
			"[FS] format complete: total_blocks={} total_inodes={}",
			crate::config::TOTAL_BLOCKS,
			crate::config::MAX_INODES
		);
		Ok(())
	}

	/// Loads the superblock and bitmaps from disk.
	pub fn mount(&mut self) -> Result<()> {
		eprintln!("[FS] mounting file system");
		let mut buf = vec![0u8; BLOCK_SIZE];
		self.disk.read_block(crate::config::SUPERBLOCK_BLOCK, &mut buf)?;
		let superblock = SuperBlock::from_block(&buf);

		if superblock.magic != crate::config::FS_MAGIC {
			eprintln!(
				"[FS] mount failed: magic mismatch (expected {:#x}, found {:#x})",
				crate::config::FS_MAGIC,
				superblock.magic
			);
			return Err(Error::BadMagic);
		}

		let bitmap = BitmapAllocator::load(&mut self.disk)?;

		self.superblock = Some(superblock);
		self.bitmap = Some(bitmap);
		self.current_dir = "/".to_string();
		self.fd_table = FileDescriptorTable::new();
		self.mounted = true;

		eprintln!(
			"[FS] mount successful: free_blocks={} free_inodes={}",
			superblock.free_blocks, superblock.free_inodes
		);
		Ok(())
	}

	/// Recomputes `free_inodes`/`free_blocks` by popcount over the bitmaps.
	pub fn refresh_from_bitmaps(&mut self) -> Result<()> {
		self.require_mounted()?;
		let (free_inodes, free_blocks) = self.bitmap.as_ref().unwrap().count_free();
		let sb = self.sb_mut();
		sb.free_inodes = free_inodes;
		sb.free_blocks = free_blocks;
		Ok(())
	}

	pub fn change_directory(&mut self, path: &str) -> Result<()> {
		self.require_mounted()?;
		let target = DirectoryService::lookup_path(&mut self.disk, path, &self.current_dir)?;
		let inode = InodeStore::read_inode(&mut self.disk, target)?;
		if inode.kind != FileType::Directory {
			return Err(Error::NotADirectory);
		}
		self.current_dir = DirectoryService::normalize_path(path, &self.current_dir);
		Ok(())
	}

	pub fn create_directory(&mut self, path: &str) -> Result<()> {
		self.require_mounted()?;
		let cwd = self.current_dir.clone();
		let bitmap = self.bitmap.as_mut().unwrap();
		DirectoryService::create_directory(&mut self.disk, bitmap, path, &cwd)?;
		self.sync_counters()
	}

	pub fn list_directory(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
		self.require_mounted()?;
		let inode = DirectoryService::lookup_path(&mut self.disk, path, &self.current_dir)?;
		DirectoryService::list_directory(&mut self.disk, inode)
	}

	pub fn create_file(&mut self, path: &str) -> Result<()> {
		self.require_mounted()?;
		let normalized = DirectoryService::normalize_path(path, &self.current_dir);
		let (parent_path, name) = DirectoryService::split_path(&normalized);
		if name.is_empty() {
			return Err(Error::Exists);
		}

		let parent_inode = DirectoryService::lookup_path(&mut self.disk, &parent_path, &self.current_dir)?;
		let parent = InodeStore::read_inode(&mut self.disk, parent_inode)?;
		if parent.kind != FileType::Directory {
			return Err(Error::NotADirectory);
		}
		if DirectoryService::lookup_in_directory(&mut self.disk, parent_inode, &name)?.is_some() {
			return Err(Error::Exists);
		}

		let new_inode_num = self.bitmap_mut().alloc_inode();
		if new_inode_num == crate::config::INVALID_INODE {
			return Err(Error::NoSpace);
		}

		if let Err(e) = InodeStore::write_inode(&mut self.disk, new_inode_num, Inode::new_file()) {
			self.bitmap_mut().free_inode(new_inode_num);
			return Err(e);
		}
		if let Err(e) = DirectoryService::add_directory_entry(
			&mut self.disk,
			self.bitmap.as_mut().unwrap(),
			parent_inode,
			&name,
			new_inode_num,
		) {
			self.bitmap_mut().free_inode(new_inode_num);
			return Err(e);
		}

		self.sync_counters()
	}

	pub fn remove_file(&mut self, path: &str) -> Result<()> {
		self.require_mounted()?;
		let normalized = DirectoryService::normalize_path(path, &self.current_dir);
		let (parent_path, name) = DirectoryService::split_path(&normalized);
		let inode_num = DirectoryService::lookup_path(&mut self.disk, &normalized, &self.current_dir)?;
		let inode = InodeStore::read_inode(&mut self.disk, inode_num)?;
		if inode.kind != FileType::File {
			return Err(Error::IsADirectory);
		}

		for &block in &inode.direct_blocks[..inode.blocks_used as usize] {
			self.bitmap_mut().free_block(block);
		}
		self.bitmap_mut().free_inode(inode_num);

		let parent_inode = DirectoryService::lookup_path(&mut self.disk, &parent_path, &self.current_dir)?;
		DirectoryService::remove_directory_entry(&mut self.disk, parent_inode, &name)?;

		self.sync_counters()
	}

	pub fn open_file(&mut self, path: &str) -> Result<i32> {
		self.require_mounted()?;
		let inode_num = DirectoryService::lookup_path(&mut self.disk, path, &self.current_dir)?;
		let inode = InodeStore::read_inode(&mut self.disk, inode_num)?;
		if inode.kind != FileType::File {
			return Err(Error::IsADirectory);
		}
		Ok(self.fd_table.alloc_fd(inode_num))
	}

	pub fn close_file(&mut self, fd: i32) {
		self.fd_table.free_fd(fd);
	}

	pub fn read_file(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize> {
		self.require_mounted()?;
		let open = *self.fd_table.get(fd).ok_or(Error::BadFd)?;
		let inode = InodeStore::read_inode(&mut self.disk, open.inode_num)?;

		let avail = (inode.size.saturating_sub(open.offset)).min(buf.len() as u64) as usize;
		let mut read = 0usize;
		let mut offset = open.offset;

		while read < avail {
			let block_index = (offset / BLOCK_SIZE as u64) as usize;
			if block_index >= inode.blocks_used as usize {
				break;
			}
			let byte_offset = (offset % BLOCK_SIZE as u64) as usize;
			let span = (BLOCK_SIZE - byte_offset).min(avail - read);

			let mut block_buf = vec![0u8; BLOCK_SIZE];
			self.disk.read_block(inode.direct_blocks[block_index], &mut block_buf)?;
			buf[read..read + span].copy_from_slice(&block_buf[byte_offset..byte_offset + span]);

			read += span;
			offset += span as u64;
		}

		self.fd_table.get_mut(fd).unwrap().offset = offset;
		Ok(read)
	}

	pub fn write_file(&mut self, fd: i32, buf: &[u8]) -> Result<usize> {
		self.require_mounted()?;
		let open = *self.fd_table.get(fd).ok_or(Error::BadFd)?;
		let mut inode = InodeStore::read_inode(&mut self.disk, open.inode_num)?;

		let mut written = 0usize;
		let mut offset = open.offset;

		while written < buf.len() {
			let block_index = (offset / BLOCK_SIZE as u64) as usize;

			if block_index >= inode.blocks_used as usize {
				if block_index >= DIRECT_BLOCKS {
					eprintln!("[FS] write would exceed direct block pointers");
					break;
				}
				let new_block = self.bitmap_mut().alloc_block();
				if new_block == crate::config::INVALID_BLOCK {
					break;
				}
				inode.direct_blocks[block_index] = new_block;
				inode.blocks_used += 1;
			}

			let byte_offset = (offset % BLOCK_SIZE as u64) as usize;
			let span = (BLOCK_SIZE - byte_offset).min(buf.len() - written);

			let block = inode.direct_blocks[block_index];
			let mut block_buf = vec![0u8; BLOCK_SIZE];
			self.disk.read_block(block, &mut block_buf)?;
			block_buf[byte_offset..byte_offset + span].copy_from_slice(&buf[written..written + span]);
			self.disk.write_block(block, &block_buf)?;

			written += span;
			offset += span as u64;
		}

		if offset > inode.size {
			inode.size = offset;
		}
		InodeStore::write_inode(&mut self.disk, open.inode_num, inode)?;
		self.fd_table.get_mut(fd).unwrap().offset = offset;
		self.sync_counters()?;
		Ok(written)
	}

	fn sync_counters(&mut self) -> Result<()> {
		let (free_inodes, free_blocks) = self.bitmap.as_ref().unwrap().count_free();
		let sb = self.sb_mut();
		sb.free_inodes = free_inodes;
		sb.free_blocks = free_blocks;
		Ok(())
	}
}

impl Drop for FileSystem {
	fn drop(&mut self) {
		if self.mounted {
			if let Some(bitmap) = self.bitmap.as_mut() {
				if bitmap.is_dirty() {
					let _ = bitmap.save(&mut self.disk);
				}
			}
			if let Some(sb) = self.superblock {
				let _ = self.disk.write_block(crate::config::SUPERBLOCK_BLOCK, &sb.to_block());
			}
		}
	}
}
