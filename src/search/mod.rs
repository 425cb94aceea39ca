//! Beam search: a best-first graph traversal driving the candidate
//! queue and top-K result buffer.

/// The best-first traversal implementation and its result types.
pub mod beam;

pub use beam::{beam_search, Candidate, SearchOutcome, VisitedNode};
