//! Feedback dispatch.
//!
//! Turns the continuous countdown into discrete "second boundary crossed"
//! events and routes the qualifying ones to a cue or a spoken number.

mod channel;
mod config;
mod dispatcher;
mod edge;

pub use channel::{FeedbackChannel, FeedbackEvent, SilentChannel};
pub use config::{FeedbackConfig, Stride};
pub use dispatcher::FeedbackDispatcher;
pub use edge::{Crossing, EdgeDetector};
