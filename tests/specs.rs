//! Workspace-level behavioral specs for the openwork CLI.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli"]
mod cli {
    mod env;
    mod errors;
    mod help;
}

#[path = "specs/state"]
mod state {
    mod workspaces;
}
