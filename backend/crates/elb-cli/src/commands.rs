use clap::Subcommand;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Start the server and supervise it until Ctrl-C or SIGTERM
    Run,

    /// Check that the runtime, launcher and model exist and the port is free
    Check,

    /// Print every resolved path
    Paths,
}
