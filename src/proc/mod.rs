//! The process scheduler: PCB table and the tick-driven state machine.

mod pcb;
mod scheduler;

pub use pcb::{BlockedReason, Pcb, ProcessState};
pub use scheduler::Scheduler;
