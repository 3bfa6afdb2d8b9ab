//! Palaver is a full-screen terminal chat client for a multi-model LLM backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation store, the model catalog, the single-slot
//!   streaming session state machine, and the SSE transport that feeds it.
//! - [`api`] defines the wire payloads spoken to the chat backend.
//! - [`ui`] renders the transcript and runs the interactive event loop that
//!   drives user input and display updates.
//! - [`cli`] parses arguments, resolves configuration, and boots a session.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`) and
//! routes through [`crate::cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
