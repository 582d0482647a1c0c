//! The process control block and its small satellite enums.

use crate::program::Program;

/// A process's position in the scheduling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
	New,
	Ready,
	Running,
	Blocked,
	Terminated,
}

impl ProcessState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::New => "New",
			Self::Ready => "Ready",
			Self::Running => "Running",
			Self::Blocked => "Blocked",
			Self::Terminated => "Terminated",
		}
	}
}

/// Why a Blocked process is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedReason {
	None,
	Sleep,
	Device,
}

/// A process's full scheduling and accounting state.
#[derive(Debug, Clone)]
pub struct Pcb {
	pub pid: u32,
	pub state: ProcessState,
	pub time_slice: i32,
	pub time_slice_left: i32,
	pub cpu_time: i32,
	pub total_time: i32,
	pub blocked_time: i32,
	pub blocked_reason: BlockedReason,
	pub waiting_device: Option<u32>,
	pub pc: u64,
	pub virtual_pages: usize,
	pub program: Program,
}

impl Pcb {
	pub fn new(pid: u32, total_time: i32, time_slice: i32, virtual_pages: usize, program: Program) -> Self {
		Self {
			pid,
			state: ProcessState::Ready,
			time_slice,
			time_slice_left: time_slice,
			cpu_time: 0,
			total_time,
			blocked_time: 0,
			blocked_reason: BlockedReason::None,
			waiting_device: None,
			pc: 0,
			virtual_pages,
			program,
		}
	}
}
