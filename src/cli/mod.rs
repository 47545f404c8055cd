//! Console front end: command parsing, text rendering and the turn loop.

pub mod parser;
pub mod render;
pub mod session;

pub use parser::{Command, ParseError, parse_command};
pub use render::{RenderOptions, render_board};
pub use session::Session;
