//! Exclusive-ownership devices with FIFO wait queues.

use std::collections::{BTreeMap, VecDeque};

/// Process id type shared with the scheduler.
pub type Pid = u32;

/// dev_id of the pre-registered disk device.
pub const DISK_DEVICE_ID: u32 = 0;

struct Device {
	name: String,
	owner: Option<Pid>,
	wait_queue: VecDeque<Pid>,
}

/// A snapshot of one device's state, for shell introspection.
#[derive(Debug, Clone)]
pub struct DeviceSnapshot {
	pub dev_id: u32,
	pub name: String,
	pub owner: Option<Pid>,
	pub wait_queue: Vec<Pid>,
}

/// The result of a `request` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
	Granted,
	NotGranted,
}

/// The result of a `release` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
	/// Ownership was handed off to the given pid.
	HandoffTo(Pid),
	/// No waiter was queued; the device is now free.
	NoHandoff,
}

/// A registry of exclusive devices, keyed by `dev_id`.
pub struct DeviceAllocator {
	devices: BTreeMap<u32, Device>,
}

impl DeviceAllocator {
	/// Builds an allocator with the disk pre-registered as device 0.
	pub fn new() -> Self {
		let mut devices = BTreeMap::new();
		devices.insert(DISK_DEVICE_ID, Device {
			name: "disk".to_string(),
			owner: None,
			wait_queue: VecDeque::new(),
		});
		Self { devices }
	}

	/// Registers a new device, or renames an existing one without
	/// disturbing its owner or wait queue.
	pub fn register_device(&mut self, dev_id: u32, name: &str) {
		self.devices
			.entry(dev_id)
			.or_insert_with(|| Device {
				name: name.to_string(),
				owner: None,
				wait_queue: VecDeque::new(),
			})
			.name = name.to_string();
	}

	pub fn has_device(&self, dev_id: u32) -> bool {
		self.devices.contains_key(&dev_id)
	}

	/// Requests `dev_id` on behalf of `pid`.
	pub fn request(&mut self, pid: Pid, dev_id: u32) -> RequestOutcome {
		let Some(dev) = self.devices.get_mut(&dev_id) else {
			eprintln!("[Dev] invalid device id={dev_id} (pid={pid})");
			return RequestOutcome::NotGranted;
		};

		match dev.owner {
			None => {
				dev.owner = Some(pid);
				eprintln!("[Dev] granted dev={dev_id} ({}) to pid={pid}", dev.name);
				RequestOutcome::Granted
			}
			Some(owner) if owner == pid => {
				eprintln!(
					"[Dev] request dev={dev_id} ({}) ignored: pid={pid} already owns it",
					dev.name
				);
				RequestOutcome::Granted
			}
			Some(owner) => {
				if !dev.wait_queue.contains(&pid) {
					dev.wait_queue.push_back(pid);
					eprintln!(
						"[Dev] queued pid={pid} for dev={dev_id} ({}), owner={owner}, qlen={}",
						dev.name,
						dev.wait_queue.len()
					);
				} else {
					eprintln!(
						"[Dev] request dev={dev_id} ({}) ignored: pid={pid} already queued",
						dev.name
					);
				}
				RequestOutcome::NotGranted
			}
		}
	}

	/// Releases `dev_id`, which must currently be owned by `pid`.
	pub fn release(&mut self, pid: Pid, dev_id: u32) -> Option<ReleaseOutcome> {
		let dev = self.devices.get_mut(&dev_id)?;
		if dev.owner != Some(pid) {
			eprintln!(
				"[Dev] release dev={dev_id} ({}) denied: owner={:?}, pid={pid}",
				dev.name, dev.owner
			);
			return None;
		}

		dev.owner = None;
		match dev.wait_queue.pop_front() {
			None => {
				eprintln!("[Dev] released dev={dev_id} ({}) by pid={pid}", dev.name);
				Some(ReleaseOutcome::NoHandoff)
			}
			Some(next) => {
				dev.owner = Some(next);
				eprintln!(
					"[Dev] released dev={dev_id} ({}) by pid={pid}, reassigned to pid={next}, qlen={}",
					dev.name,
					dev.wait_queue.len()
				);
				Some(ReleaseOutcome::HandoffTo(next))
			}
		}
	}

	/// Removes `pid` from every wait queue, returning the number of removals.
	pub fn cancel_wait(&mut self, pid: Pid) -> usize {
		let mut removed = 0;
		for (dev_id, dev) in self.devices.iter_mut() {
			let before = dev.wait_queue.len();
			dev.wait_queue.retain(|&p| p != pid);
			let after = dev.wait_queue.len();
			if after != before {
				removed += before - after;
				eprintln!("[Dev] removed pid={pid} from dev={dev_id} ({}) wait queue", dev.name);
			}
		}
		removed
	}

	/// Releases every device owned by `pid` and cancels its waits.
	///
	/// This is the hook the scheduler calls on process termination.
	pub fn release_all(&mut self, pid: Pid) -> Vec<(u32, Option<ReleaseOutcome>)> {
		let owned: Vec<u32> = self
			.devices
			.iter()
			.filter(|(_, dev)| dev.owner == Some(pid))
			.map(|(&id, _)| id)
			.collect();

		let events = owned
			.into_iter()
			.map(|dev_id| (dev_id, self.release(pid, dev_id)))
			.collect();

		self.cancel_wait(pid);
		events
	}

	/// A snapshot of every device, sorted by `dev_id`.
	pub fn snapshot(&self) -> Vec<DeviceSnapshot> {
		self.devices
			.iter()
			.map(|(&dev_id, dev)| DeviceSnapshot {
				dev_id,
				name: dev.name.clone(),
				owner: dev.owner,
				wait_queue: dev.wait_queue.iter().copied().collect(),
			})
			.collect()
	}
}

impl Default for DeviceAllocator {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn fifo_handoff_scenario() {
		let mut dev = DeviceAllocator::new();
		assert_eq!(dev.request(10, DISK_DEVICE_ID), RequestOutcome::Granted);
		assert_eq!(dev.request(11, DISK_DEVICE_ID), RequestOutcome::NotGranted);
		assert_eq!(dev.request(12, DISK_DEVICE_ID), RequestOutcome::NotGranted);

		assert_eq!(dev.release(10, DISK_DEVICE_ID), Some(ReleaseOutcome::HandoffTo(11)));
		assert_eq!(dev.release(11, DISK_DEVICE_ID), Some(ReleaseOutcome::HandoffTo(12)));
		assert_eq!(dev.release(12, DISK_DEVICE_ID), Some(ReleaseOutcome::NoHandoff));

		let snap = dev.snapshot();
		let disk = snap.iter().find(|s| s.dev_id == DISK_DEVICE_ID).unwrap();
		assert_eq!(disk.owner, None);
		assert!(disk.wait_queue.is_empty());
	}

	#[test]
	fn unknown_device_is_never_granted() {
		let mut dev = DeviceAllocator::new();
		assert_eq!(dev.request(1, 99), RequestOutcome::NotGranted);
		assert!(dev.release(1, 99).is_none());
	}

	#[test]
	fn requesting_owned_device_again_is_idempotent() {
		let mut dev = DeviceAllocator::new();
		assert_eq!(dev.request(1, DISK_DEVICE_ID), RequestOutcome::Granted);
		assert_eq!(dev.request(1, DISK_DEVICE_ID), RequestOutcome::Granted);
		let snap = dev.snapshot();
		assert!(snap[0].wait_queue.is_empty());
	}

	#[test]
	fn release_by_non_owner_is_denied() {
		let mut dev = DeviceAllocator::new();
		dev.request(1, DISK_DEVICE_ID);
		assert!(dev.release(2, DISK_DEVICE_ID).is_none());
	}

	#[test]
	fn release_all_hands_off_and_cancels_waits() {
		let mut dev = DeviceAllocator::new();
		dev.register_device(1, "tape");
		dev.request(1, DISK_DEVICE_ID);
		dev.request(1, 1);
		dev.request(2, 1); // waits on tape
		dev.request(1, 1); // already owns disk; but tape is separate: pid 1 waits? no, owns tape already

		let events = dev.release_all(1);
		assert!(events.iter().any(|(id, _)| *id == DISK_DEVICE_ID));

		// pid 1's waits (if any) are cancelled; requesting disk again should succeed for pid 2.
		assert_eq!(dev.request(2, DISK_DEVICE_ID), RequestOutcome::Granted);
	}

	#[test]
	fn wait_queue_has_no_duplicates() {
		let mut dev = DeviceAllocator::new();
		dev.request(1, DISK_DEVICE_ID);
		dev.request(2, DISK_DEVICE_ID);
		dev.request(2, DISK_DEVICE_ID);
		let snap = dev.snapshot();
		let disk = &snap[0];
		assert_eq!(disk.wait_queue, vec![2]);
	}
}
