//! Compile-time geometry and scheduling constants.
//!
//! Mirrors the original `tinix::config` namespace: disk geometry, memory
//! framing and default scheduling parameters all live here so format and
//! mount can never disagree about layout.

/// Number of physical page frames backing the (minimal) memory manager.
pub const PAGE_FRAMES: usize = 8;
/// Size of a virtual memory page in bytes.
pub const PAGE_SIZE: usize = 4096;
/// Default number of virtual pages handed to a freshly created process.
pub const DEFAULT_VIRTUAL_PAGES: usize = 256;

/// Default name of the disk image file.
pub const DISK_IMAGE_NAME: &str = "disk.img";
/// Size in bytes of one disk block.
pub const BLOCK_SIZE: usize = 4096;
/// Total number of blocks on the disk.
pub const TOTAL_BLOCKS: usize = 1024;

/// Default length of a process's scheduling quantum, in ticks.
pub const DEFAULT_TIME_SLICE: i32 = 3;

/// Block index of the superblock.
pub const SUPERBLOCK_BLOCK: u32 = 0;
/// Block index of the inode bitmap.
pub const INODE_BITMAP_BLOCK: u32 = 1;
/// Block index of the data bitmap.
pub const DATA_BITMAP_BLOCK: u32 = 2;
/// First block of the inode table.
pub const INODE_TABLE_START: u32 = 3;

/// Maximum length of a path component, not counting the NUL terminator.
pub const NAME_MAX: usize = 27;
/// Number of direct block pointers stored in each inode.
pub const DIRECT_BLOCKS: usize = 12;

/// Magic number stamped into the superblock by `format`.
pub const FS_MAGIC: u32 = 0x54_49_4E_58; // "TINX"
/// Inode number of the file system root directory.
pub const ROOT_INODE: u32 = 1;

/// Size in bytes of one serialized [`crate::fs::inode::Inode`] record.
///
/// `NAME_MAX`/`DIRECT_BLOCKS` are chosen so this divides `BLOCK_SIZE` evenly
/// (see the `inodes_per_block` assertion in `fs::inode`).
pub const INODE_SIZE: usize = 64;
/// Size in bytes of one serialized [`crate::fs::dirent::DirectoryEntry`] record.
pub const DIRENT_SIZE: usize = NAME_MAX + 1 + 4;

/// Number of inodes that fit in one block.
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
/// Maximum number of inodes the file system can hold.
///
/// Chosen so the inode table occupies a whole number of blocks.
pub const MAX_INODES: usize = INODES_PER_BLOCK * 8;
/// Number of blocks occupied by the inode table.
pub const INODE_TABLE_BLOCKS: usize = MAX_INODES / INODES_PER_BLOCK;
/// First block of the data region.
pub const DATA_BLOCKS_START: u32 = INODE_TABLE_START + INODE_TABLE_BLOCKS as u32;
/// Number of blocks available for file/directory data.
pub const MAX_DATA_BLOCKS: usize = TOTAL_BLOCKS - DATA_BLOCKS_START as usize;

/// Sentinel returned by inode allocation on exhaustion (all-ones).
pub const INVALID_INODE: u32 = u32::MAX;
/// Sentinel returned by block allocation on exhaustion (all-ones).
pub const INVALID_BLOCK: u32 = u32::MAX;

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn inode_table_is_whole_blocks() {
		assert_eq!(BLOCK_SIZE % INODE_SIZE, 0);
		assert_eq!(MAX_INODES % INODES_PER_BLOCK, 0);
	}

	#[test]
	fn layout_fits_on_disk() {
		assert!((DATA_BLOCKS_START as usize) < TOTAL_BLOCKS);
		assert!(MAX_DATA_BLOCKS > 0);
	}
}
