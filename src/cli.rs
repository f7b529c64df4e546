use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mediacenter",
    about = "Media control server: index media folders and drive a player over a tiny TCP protocol",
    long_about = None,
    version,
    arg_required_else_help = true,
)]
pub struct Args {
    /// One or more directories to index
    #[arg(num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// TCP port to listen on [default: 5002]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to TOML config file (overrides default search: ./mediacenter.toml, ~/.config/mediacenter/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bind to localhost only (127.0.0.1) instead of all interfaces (0.0.0.0)
    #[arg(long)]
    pub localhost: bool,
}
