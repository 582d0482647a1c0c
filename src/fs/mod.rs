//! The block-structured file system: on-disk layout, allocation, and the
//! mounted-filesystem façade.

mod bitmap;
mod dirent;
mod directory;
mod fd_table;
mod filesystem;
mod inode;
mod superblock;

pub use dirent::DirectoryEntry;
pub use fd_table::OpenFile;
pub use filesystem::FileSystem;
pub use inode::{FileType, Inode};
pub use superblock::SuperBlock;
