pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod services;
pub mod state;
pub mod surface;
pub(crate) mod util;
