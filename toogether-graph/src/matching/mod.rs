//! Candidate queues, swipes, and the mutual-like to match rule.

pub mod derive;
pub mod queue;
pub mod swipe;

pub use derive::{list_matches, try_create_match};
pub use queue::{build_queue, CandidateQueue, QueueOptions};
pub use swipe::swipe;
