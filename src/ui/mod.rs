//! Terminal front end for interactive chat sessions.
//!
//! - [`chat_loop`]: the session loop that reads input, dispatches it to
//!   [`crate::commands`] or the model backends, and prints what changed.
//! - [`renderer`]: turns transcript entries into ANSI-styled lines.
//!
//! Ownership boundary: this layer presents and captures interaction state,
//! while [`crate::core`] owns the transcript and backend coordination.

pub mod chat_loop;
pub mod renderer;
