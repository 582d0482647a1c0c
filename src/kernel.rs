//! The composition root: wires the disk-backed file system, the device
//! allocator, the memory manager and the scheduler together behind the
//! surface the shell drives.

use crate::config::DEFAULT_VIRTUAL_PAGES;
use crate::dev::{DeviceAllocator, DeviceSnapshot, ReleaseOutcome, RequestOutcome};
use crate::error::{Error, Result};
use crate::fs::{DirectoryEntry, FileSystem, SuperBlock};
use crate::mem::FrameMemoryManager;
use crate::proc::{BlockedReason, Pcb, Scheduler};
use crate::program::Program;

/// Owns every subsystem and is the sole point where cross-subsystem effects
/// (device release on process termination, memory teardown) are wired up.
///
/// Field order matters here the way it does in the original composition:
/// the memory manager is constructed before the scheduler that borrows it.
pub struct Kernel {
	disk_fs: FileSystem,
	devices: DeviceAllocator,
	scheduler: Scheduler<FrameMemoryManager>,
}

impl Kernel {
	/// Builds a kernel over the default disk image, unmounted.
	pub fn new() -> Result<Self> {
		Ok(Self {
			disk_fs: FileSystem::new_default()?,
			devices: DeviceAllocator::new(),
			scheduler: Scheduler::new(FrameMemoryManager::new()),
		})
	}

	/// Builds a kernel over the disk image at `path`, mainly for tests.
	pub fn new_with_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
		Ok(Self {
			disk_fs: FileSystem::new(path)?,
			devices: DeviceAllocator::new(),
			scheduler: Scheduler::new(FrameMemoryManager::new()),
		})
	}

	// -- file system surface -------------------------------------------------

	pub fn format(&mut self) -> Result<()> {
		self.disk_fs.format()
	}

	pub fn mount(&mut self) -> Result<()> {
		self.disk_fs.mount()
	}

	pub fn is_mounted(&self) -> bool {
		self.disk_fs.is_mounted()
	}

	pub fn get_current_directory(&self) -> &str {
		self.disk_fs.get_current_directory()
	}

	pub fn superblock(&self) -> Result<&SuperBlock> {
		self.disk_fs.superblock()
	}

	pub fn create_directory(&mut self, path: &str) -> Result<()> {
		self.disk_fs.create_directory(path)
	}

	pub fn list_directory(&mut self, path: &str) -> Result<Vec<DirectoryEntry>> {
		self.disk_fs.list_directory(path)
	}

	pub fn change_directory(&mut self, path: &str) -> Result<()> {
		self.disk_fs.change_directory(path)
	}

	pub fn create_file(&mut self, path: &str) -> Result<()> {
		self.disk_fs.create_file(path)
	}

	pub fn remove_file(&mut self, path: &str) -> Result<()> {
		self.disk_fs.remove_file(path)
	}

	pub fn open_file(&mut self, path: &str) -> Result<i32> {
		self.disk_fs.open_file(path)
	}

	pub fn close_file(&mut self, fd: i32) {
		self.disk_fs.close_file(fd)
	}

	pub fn read_file(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize> {
		self.disk_fs.read_file(fd, buf)
	}

	pub fn write_file(&mut self, fd: i32, buf: &[u8]) -> Result<usize> {
		self.disk_fs.write_file(fd, buf)
	}

	// -- device surface -------------------------------------------------------

	pub fn request_device(&mut self, pid: u32, dev_id: u32) -> Result<RequestOutcome> {
		if !self.devices.has_device(dev_id) {
			return Err(Error::UnknownDevice);
		}
		Ok(self.devices.request(pid, dev_id))
	}

	pub fn release_device(&mut self, pid: u32, dev_id: u32) -> Result<ReleaseOutcome> {
		if !self.devices.has_device(dev_id) {
			return Err(Error::UnknownDevice);
		}
		self.devices.release(pid, dev_id).ok_or(Error::NotOwner)
	}

	pub fn has_device(&self, dev_id: u32) -> bool {
		self.devices.has_device(dev_id)
	}

	pub fn register_device(&mut self, dev_id: u32, name: &str) {
		self.devices.register_device(dev_id, name)
	}

	pub fn device_snapshot(&self) -> Vec<DeviceSnapshot> {
		self.devices.snapshot()
	}

	// -- process surface --------------------------------------------------------

	pub fn create_process(&mut self, total_time: i32, program: Program) -> u32 {
		self.scheduler.create_process(total_time, DEFAULT_VIRTUAL_PAGES, program)
	}

	/// Terminates `pid`, releasing every device it owns and cancelling its
	/// waits, in addition to removing its scheduling state.
	pub fn terminate_process(&mut self, pid: u32) -> Result<()> {
		self.scheduler.terminate_process(pid)?;
		for (dev_id, outcome) in self.devices.release_all(pid) {
			if let Some(ReleaseOutcome::HandoffTo(next)) = outcome {
				eprintln!("[Kernel] dev={dev_id} handed off to pid={next} after pid={pid} terminated");
			}
		}
		Ok(())
	}

	pub fn run_process(&mut self, pid: u32) -> Result<()> {
		self.scheduler.run_process(pid)
	}

	/// Blocks `pid` on a sleep of `duration` ticks.
	pub fn sleep_process(&mut self, pid: u32, duration: i32) -> Result<()> {
		self.scheduler.block_process(pid, duration, BlockedReason::Sleep, None)
	}

	/// Blocks `pid` waiting on `dev_id`, having already failed to acquire it
	/// via [`Kernel::request_device`].
	pub fn block_on_device(&mut self, pid: u32, dev_id: u32) -> Result<()> {
		self.scheduler.block_process(pid, 0, BlockedReason::Device, Some(dev_id))
	}

	pub fn wakeup_process(&mut self, pid: u32) -> Result<()> {
		self.scheduler.wakeup_process(pid)
	}

	pub fn tick(&mut self) {
		self.scheduler.tick();
	}

	pub fn dump_processes(&self) -> String {
		self.scheduler.dump_processes()
	}

	pub fn process(&self, pid: u32) -> Option<&Pcb> {
		self.scheduler.get(pid)
	}
}
