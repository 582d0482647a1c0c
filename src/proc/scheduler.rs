//! The process scheduler: PCB table, ready queue and the tick state machine.

use std::collections::{BTreeMap, VecDeque};

use crate::config::DEFAULT_TIME_SLICE;
use crate::error::{Error, Result};
use crate::mem::MemoryManager;
use crate::proc::pcb::{BlockedReason, Pcb, ProcessState};
use crate::program::Program;

/// Coordinates process creation, blocking/waking and round-robin dispatch.
///
/// Holds processes in a [`BTreeMap`] (not a hash map) so iteration — dump,
/// and same-tick wakeup ordering — is always in ascending pid order.
pub struct Scheduler<M: MemoryManager> {
	processes: BTreeMap<u32, Pcb>,
	ready_queue: VecDeque<u32>,
	next_pid: u32,
	next_tick: u64,
	current_running: Option<u32>,
	mem: M,
}

impl<M: MemoryManager> Scheduler<M> {
	pub fn new(mem: M) -> Self {
		Self {
			processes: BTreeMap::new(),
			ready_queue: VecDeque::new(),
			next_pid: 1,
			next_tick: 0,
			current_running: None,
			mem,
		}
	}

	pub fn current_running(&self) -> Option<u32> {
		self.current_running
	}

	pub fn get(&self, pid: u32) -> Option<&Pcb> {
		self.processes.get(&pid)
	}

	/// Creates a process running `program` with `total_time` ticks of CPU
	/// work and `virtual_pages` requested from the memory manager.
	pub fn create_process(&mut self, total_time: i32, virtual_pages: usize, program: Program) -> u32 {
		let pid = self.next_pid;
		self.next_pid += 1;

		self.mem.construct(pid, virtual_pages);
		let pcb = Pcb::new(pid, total_time, DEFAULT_TIME_SLICE, virtual_pages, program);
		self.processes.insert(pid, pcb);
		self.ready_queue.push_back(pid);

		eprintln!("[Proc] process {pid} created (total_time={total_time}) and added to ready queue");
		pid
	}

	/// Removes the PCB outright. Stale ready-queue entries for `pid` are
	/// skipped, not eagerly purged, at the next `schedule`.
	pub fn terminate_process(&mut self, pid: u32) -> Result<()> {
		if self.processes.remove(&pid).is_none() {
			return Err(Error::BadState);
		}
		if self.current_running == Some(pid) {
			self.current_running = None;
		}
		self.mem.teardown(pid);
		eprintln!("[Proc] process {pid} terminated");
		Ok(())
	}

	/// Explicit foreground dispatch, preempting whatever is currently running.
	pub fn run_process(&mut self, pid: u32) -> Result<()> {
		let state = self.processes.get(&pid).map(|p| p.state).ok_or(Error::BadState)?;
		if state != ProcessState::Ready {
			return Err(Error::BadState);
		}

		if let Some(running) = self.current_running {
			if running != pid {
				if let Some(pcb) = self.processes.get_mut(&running) {
					pcb.state = ProcessState::Ready;
					self.ready_queue.push_back(running);
					eprintln!("[Proc] process {running} preempted");
				}
			}
		}

		let pcb = self.processes.get_mut(&pid).unwrap();
		pcb.state = ProcessState::Running;
		self.current_running = Some(pid);
		eprintln!("[Proc] process {pid} is now running");
		Ok(())
	}

	/// Blocks `pid`, valid only from Running or Ready.
	pub fn block_process(&mut self, pid: u32, duration: i32, reason: BlockedReason, waiting_device: Option<u32>) -> Result<()> {
		let pcb = self.processes.get_mut(&pid).ok_or(Error::BadState)?;
		if pcb.state != ProcessState::Running && pcb.state != ProcessState::Ready {
			return Err(Error::BadState);
		}
		pcb.state = ProcessState::Blocked;
		pcb.blocked_time = duration;
		pcb.blocked_reason = reason;
		pcb.waiting_device = waiting_device;
		eprintln!("[Proc] process {pid} is blocked for {duration} ticks");

		if self.current_running == Some(pid) {
			self.current_running = None;
			self.schedule();
		}
		Ok(())
	}

	/// Wakes `pid`, valid only from Blocked.
	pub fn wakeup_process(&mut self, pid: u32) -> Result<()> {
		let pcb = self.processes.get_mut(&pid).ok_or(Error::BadState)?;
		if pcb.state != ProcessState::Blocked {
			return Err(Error::BadState);
		}
		pcb.state = ProcessState::Ready;
		pcb.blocked_time = 0;
		pcb.blocked_reason = BlockedReason::None;
		pcb.waiting_device = None;
		self.ready_queue.push_back(pid);
		eprintln!("[Proc] process {pid} woken up and added to ready queue");
		Ok(())
	}

	/// Pops from the ready queue until a still-Ready PCB is found and
	/// promotes it; leaves the CPU idle if the queue drains first.
	fn schedule(&mut self) {
		while let Some(pid) = self.ready_queue.pop_front() {
			let Some(pcb) = self.processes.get_mut(&pid) else {
				continue;
			};
			if pcb.state != ProcessState::Ready {
				continue;
			}
			pcb.state = ProcessState::Running;
			self.current_running = Some(pid);
			eprintln!("[Schedule] process {pid} is now running");
			return;
		}
		eprintln!("[Schedule] CPU idle - no ready processes");
	}

	/// Advances simulated time by one tick, in the fixed four-step order:
	/// age blocked processes, consume the running process's quantum,
	/// reschedule if the CPU is idle.
	pub fn tick(&mut self) {
		self.next_tick += 1;
		eprintln!("[Tick] === tick {} ===", self.next_tick - 1);

		for pid in self.pids_in_order() {
			let pcb = self.processes.get_mut(&pid).unwrap();
			if pcb.state == ProcessState::Blocked && pcb.blocked_time > 0 {
				pcb.blocked_time -= 1;
				if pcb.blocked_time <= 0 {
					pcb.state = ProcessState::Ready;
					pcb.blocked_reason = BlockedReason::None;
					self.ready_queue.push_back(pid);
					eprintln!("[Tick] process {pid} auto-woken up");
				}
			}
		}

		if let Some(pid) = self.current_running {
			let pcb = self.processes.get_mut(&pid).unwrap();
			pcb.time_slice_left -= 1;
			pcb.cpu_time += 1;
			eprintln!(
				"[Tick] process {pid} executing ({}/{}, remaining: {})",
				pcb.cpu_time, pcb.total_time, pcb.time_slice_left
			);

			if pcb.cpu_time >= pcb.total_time {
				eprintln!("[Tick] process {pid} completed");
				self.processes.remove(&pid);
				self.mem.teardown(pid);
				self.current_running = None;
			} else if pcb.time_slice_left <= 0 {
				eprintln!("[Tick] process {pid} time slice exhausted");
				pcb.state = ProcessState::Ready;
				pcb.time_slice_left = pcb.time_slice;
				self.ready_queue.push_back(pid);
				self.current_running = None;
			}
		}

		if self.current_running.is_none() {
			self.schedule();
		}
	}

	fn pids_in_order(&self) -> Vec<u32> {
		self.processes.keys().copied().collect()
	}

	/// A line-oriented textual dump, in ascending pid order, matching the
	/// shell's `ps`-style output.
	pub fn dump_processes(&self) -> String {
		let mut out = String::from("PID\tState\t\tRemain\tCPU/Total\tBlocked\n");
		for pcb in self.processes.values() {
			out.push_str(&format!(
				"{}\t{}\t\t{}\t{}/{}\t\t{}\n",
				pcb.pid,
				pcb.state.as_str(),
				pcb.time_slice_left,
				pcb.cpu_time,
				pcb.total_time,
				pcb.blocked_time
			));
		}
		match self.current_running {
			Some(pid) => out.push_str(&format!("Currently running: {pid}\n")),
			None => out.push_str("CPU idle\n"),
		}
		out
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::mem::FrameMemoryManager;

	fn sched() -> Scheduler<FrameMemoryManager> {
		Scheduler::new(FrameMemoryManager::new())
	}

	#[test]
	fn create_enqueues_and_assigns_ascending_pids() {
		let mut s = sched();
		let a = s.create_process(10, 1, Program::default());
		let b = s.create_process(10, 1, Program::default());
		assert_eq!(a, 1);
		assert_eq!(b, 2);
	}

	#[test]
	fn first_tick_schedules_the_only_ready_process() {
		let mut s = sched();
		let pid = s.create_process(10, 1, Program::default());
		s.tick();
		assert_eq!(s.current_running(), Some(pid));
	}

	#[test]
	fn process_terminates_when_cpu_time_reaches_total() {
		let mut s = sched();
		let pid = s.create_process(1, 1, Program::default());
		s.tick(); // scheduled, quantum not yet consumed
		s.tick(); // cpu_time reaches total_time -> terminated
		assert!(s.get(pid).is_none());
		assert_eq!(s.current_running(), None);
	}

	#[test]
	fn quantum_exhaustion_requeues_without_terminating() {
		let mut s = sched();
		let pid = s.create_process(100, 1, Program::default());
		// tick 1 only schedules the process; its quantum starts counting
		// down from tick 2, so exhaustion takes one extra tick.
		for _ in 0..=DEFAULT_TIME_SLICE {
			s.tick();
		}
		let pcb = s.get(pid).unwrap();
		assert_eq!(pcb.state, ProcessState::Ready);
		assert_eq!(pcb.time_slice_left, DEFAULT_TIME_SLICE);
	}

	#[test]
	fn run_process_preempts_current_running() {
		let mut s = sched();
		let a = s.create_process(10, 1, Program::default());
		let b = s.create_process(10, 1, Program::default());
		s.tick(); // a runs
		assert_eq!(s.current_running(), Some(a));
		s.run_process(b).unwrap();
		assert_eq!(s.current_running(), Some(b));
		assert_eq!(s.get(a).unwrap().state, ProcessState::Ready);
	}

	#[test]
	fn block_process_clears_current_running_and_reschedules() {
		let mut s = sched();
		let a = s.create_process(10, 1, Program::default());
		let b = s.create_process(10, 1, Program::default());
		s.tick(); // a runs, b ready
		s.block_process(a, 5, BlockedReason::Sleep, None).unwrap();
		assert_eq!(s.current_running(), Some(b));
		assert_eq!(s.get(a).unwrap().state, ProcessState::Blocked);
	}

	#[test]
	fn blocked_process_auto_wakes_after_blocked_time_elapses() {
		let mut s = sched();
		let a = s.create_process(10, 1, Program::default());
		s.tick();
		s.block_process(a, 2, BlockedReason::Sleep, None).unwrap();
		s.tick();
		assert_eq!(s.get(a).unwrap().state, ProcessState::Blocked);
		s.tick();
		assert_eq!(s.get(a).unwrap().state, ProcessState::Ready);
	}

	#[test]
	fn device_blocked_process_is_not_auto_woken_by_tick() {
		let mut s = sched();
		let a = s.create_process(10, 1, Program::default());
		s.tick();
		s.block_process(a, 0, BlockedReason::Device, Some(0)).unwrap();
		for _ in 0..5 {
			s.tick();
		}
		assert_eq!(s.get(a).unwrap().state, ProcessState::Blocked);
	}

	#[test]
	fn terminate_of_unknown_pid_is_bad_state() {
		let mut s = sched();
		assert!(matches!(s.terminate_process(99), Err(Error::BadState)));
	}

	#[test]
	fn stale_ready_queue_entry_is_skipped_at_schedule_time() {
		let mut s = sched();
		let a = s.create_process(10, 1, Program::default());
		let b = s.create_process(10, 1, Program::default());
		s.block_process(a, 100, BlockedReason::Sleep, None).unwrap();
		// a is still in the ready queue (never eagerly removed); schedule
		// must skip it since its state is Blocked, not Ready.
		s.tick();
		assert_eq!(s.current_running(), Some(b));
	}
}
