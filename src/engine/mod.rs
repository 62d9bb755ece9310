//! Core engine: the bet → track → next wager → switch → present loop.

pub mod clock;
pub mod runner;
pub mod session;
