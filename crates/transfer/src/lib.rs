#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::cast_possible_truncation)]

//! SDK package build and transfer for sdkpack
//!
//! A [`PackageTransferTask`] asks the external packaging tool for an SDK
//! archive and streams it to a peer in window-sized chunks. Tasks are owned
//! by a [`Scheduler`] which polls them; a task never blocks and never spawns
//! threads, and every task finishes within its deadline.

pub mod channel;
pub mod clock;
pub mod message;
pub mod request;
pub mod scheduler;
pub mod task;

pub use channel::{Channel, ChannelRegistry, InMemoryRegistry, MemoryChannel, PeerAddress};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use message::{Assembly, ChunkAssembler, ImportChunk, Message, MessageId};
pub use request::{normalize_window, TaskSettings, TransferRequest};
pub use scheduler::{Completion, Scheduler, TaskHandle};
pub use task::{
    PackageTransferTask, PollStatus, TaskContext, TaskState, TransferOutcome, TransferReport,
};
