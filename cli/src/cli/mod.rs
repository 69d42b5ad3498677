use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List every battery (the default)
    #[command(alias = "ls")]
    List,

    /// Show one battery by index
    Get {
        #[arg(default_value_t = 0)]
        index: usize,
    },

    /// Show or reset the config file
    Config {
        #[arg(long)]
        path: bool,

        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "cellstat", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Print JSON on a single line
    #[arg(short, long, global = true)]
    pub compact: bool,

    #[arg(long, global = true)]
    pub log_level: Option<String>,
}
