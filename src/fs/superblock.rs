//! The on-disk superblock record (block 0).

use crate::config::{
	BLOCK_SIZE, DATA_BITMAP_BLOCK, DATA_BLOCKS_START, FS_MAGIC, INODE_BITMAP_BLOCK,
	INODE_TABLE_BLOCKS, INODE_TABLE_START, MAX_DATA_BLOCKS, MAX_INODES, TOTAL_BLOCKS,
};

/// Number of `u32` fields serialized for the superblock.
const FIELD_COUNT: usize = 10;
/// Serialized size of a [`SuperBlock`] in bytes.
pub const SUPERBLOCK_SIZE: usize = FIELD_COUNT * 4;

/// The file system header, persisted at block 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
	pub magic: u32,
	pub total_blocks: u32,
	pub total_inodes: u32,
	pub free_blocks: u32,
	pub free_inodes: u32,
	pub inode_bitmap_block: u32,
	pub data_bitmap_block: u32,
	pub inode_table_start: u32,
	pub inode_table_blocks: u32,
	pub data_blocks_start: u32,
}

impl SuperBlock {
	/// Builds the superblock written by `format`, with `used_inodes` already
	/// accounted for against `free_inodes` (the root directory's inode).
	pub fn fresh(used_inodes: u32) -> Self {
		Self {
			magic: FS_MAGIC,
			total_blocks: TOTAL_BLOCKS as u32,
			total_inodes: MAX_INODES as u32,
			free_blocks: MAX_DATA_BLOCKS as u32,
			free_inodes: MAX_INODES as u32 - used_inodes,
			inode_bitmap_block: INODE_BITMAP_BLOCK,
			data_bitmap_block: DATA_BITMAP_BLOCK,
			inode_table_start: INODE_TABLE_START,
			inode_table_blocks: INODE_TABLE_BLOCKS as u32,
			data_blocks_start: DATA_BLOCKS_START,
		}
	}

	/// Serializes the superblock into a full, zero-padded block-sized buffer.
	pub fn to_block(&self) -> Vec<u8> {
		let mut buf = vec![0u8; BLOCK_SIZE];
		let fields = [
			self.magic,
			self.total_blocks,
			self.total_inodes,
			self.free_blocks,
			self.free_inodes,
			self.inode_bitmap_block,
			self.data_bitmap_block,
			self.inode_table_start,
			self.inode_table_blocks,
			self.data_blocks_start,
		];
		for (i, field) in fields.iter().enumerate() {
			buf[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
		}
		buf
	}

	/// Deserializes a superblock from a block-sized buffer.
	pub fn from_block(block: &[u8]) -> Self {
		let read_u32 = |i: usize| {
			u32::from_le_bytes(block[i * 4..i * 4 + 4].try_into().unwrap())
		};
		Self {
			magic: read_u32(0),
			total_blocks: read_u32(1),
			total_inodes: read_u32(2),
			free_blocks: read_u32(3),
			free_inodes: read_u32(4),
			inode_bitmap_block: read_u32(5),
			data_bitmap_block: read_u32(6),
			inode_table_start: read_u32(7),
			inode_table_blocks: read_u32(8),
			data_blocks_start: read_u32(9),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trips_through_bytes() {
		let sb = SuperBlock::fresh(1);
		let block = sb.to_block();
		assert_eq!(block.len(), BLOCK_SIZE);
		let back = SuperBlock::from_block(&block);
		assert_eq!(sb, back);
	}

	#[test]
	fn fresh_accounts_for_root_inode() {
		let sb = SuperBlock::fresh(1);
		assert_eq!(sb.free_inodes, MAX_INODES as u32 - 1);
		assert_eq!(sb.free_blocks, MAX_DATA_BLOCKS as u32);
	}
}
