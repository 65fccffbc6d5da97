pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use vidvault_core::error::Result;

pub fn run(cli: Cli) -> Result<()> {
    let backend = cli.backend.into();
    match cli.command {
        Commands::Encode(args) => handlers::handle_encode(backend, args),
        Commands::Decode(args) => handlers::handle_decode(backend, args),
    }
}
