use crate::commands::Commands;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "elb")]
#[command(about = "Run and inspect the local inference server without the tray")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Treat the base directory as an installed bundle
    #[arg(long, global = true, conflicts_with = "development")]
    pub(crate) installed: bool,

    /// Treat the base directory as a source checkout
    #[arg(long, global = true)]
    pub(crate) development: bool,

    /// Base directory (defaults to the executable's directory when installed,
    /// else the current directory)
    #[arg(long, global = true)]
    pub(crate) base_dir: Option<PathBuf>,

    /// Directory holding config.toml when ELB_CONFIG_DIR is unset
    /// (defaults to ./.elb)
    #[arg(long, global = true)]
    pub(crate) config_dir: Option<PathBuf>,
}
