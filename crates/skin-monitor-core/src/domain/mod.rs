//! Domain entities for the skin monitor.
//!
//! Pure business logic with no infrastructure dependencies: nothing in here
//! touches sockets, timers, files, or a real DOM.  The application crate
//! supplies those and calls into these types.
//!
//! - [`document`] – what a "document" must answer, and the skin lookup rules.
//! - [`detector`] – remembers the last reported skin and reports transitions.
//! - [`skin`] – the observation and published-state records.
//! - [`endpoint`] – bridge endpoint and discovery response parsing.

pub mod detector;
pub mod document;
pub mod endpoint;
pub mod skin;
