//! Turn runtime: the queue that sequences turns and the per-turn pipeline
//! that streams an answer into a card.
//!
//! Entry point: [`TurnRunner::run`] drives one [`TurnJob`] from backend
//! stream to final card.  [`TurnQueue`] feeds it jobs one at a time.

pub mod drain;
pub mod pipeline;
pub mod queue;
pub mod reader;
pub mod turn;

pub use drain::{DrainReport, UpdateDrain};
pub use pipeline::{Mailbox, Offer, PipelineHandle};
pub use queue::{TurnHandler, TurnJob, TurnQueue, Worker};
pub use reader::{AnswerAccumulator, Step, TurnReader};
pub use turn::{Completion, TurnOutcome, TurnRunner, TurnSettings};
