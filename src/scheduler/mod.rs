//! Background task scheduler.
//!
//! Runs named jobs on fixed intervals; used to keep the mock datasets fresh.

pub mod runner;

pub use runner::{JobError, ScheduleInfo, Scheduler, SchedulerError};
