//! CLI domain: parse, route and output only.
//! Runtime wiring lives in the route's run context; behavior lives in the library.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, ConfigFormat};
pub use route::RunContext;
