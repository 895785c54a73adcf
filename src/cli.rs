//! Command-line interface.

use clap::Parser;

/// Import a network from the HOBBES web API into Hydra.
#[derive(Debug, Parser)]
#[command(name = "hobbes-import", version, about)]
pub struct Cli {
    /// The project to import data into. If none is provided, a new project
    /// is created.
    #[arg(short, long)]
    pub project_id: Option<i64>,

    /// The ID of an existing template. If none is provided, a template is
    /// inferred from the feed and uploaded.
    #[arg(short = 'm', long)]
    pub template_id: Option<i64>,

    /// Retrieve timeseries data from the HOBBES server. BEWARE: this is very
    /// data intensive and may take a long time.
    #[arg(short = 't', long)]
    pub include_timeseries: bool,

    /// How many nodes of the feed get scenario data.
    #[arg(long, default_value_t = 10)]
    pub data_nodes: usize,

    /// URL of the Hydra server this plug-in connects to.
    #[arg(short = 'u', long)]
    pub server_url: Option<String>,

    /// Session ID used by the calling software. If left empty, the plug-in
    /// logs in itself using the configured credentials.
    #[arg(short = 'c', long)]
    pub session_id: Option<String>,
}
