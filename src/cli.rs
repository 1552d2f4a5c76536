mod octocrab_utils;
mod parser;
mod tracing;

pub(crate) use octocrab_utils::build_octocrab;
pub(crate) use parser::{Cli, Commands, ServeArgs};
pub(crate) use tracing::init as init_tracing;
