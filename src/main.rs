//! HOBBES → Hydra import plug-in binary.
//!
//! All fatal conditions are caught here, folded into the plugin result
//! document, and printed; the process does not differentiate exit codes.

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use hobbes_import::cli::Cli;
use hobbes_import::config::Config;
use hobbes_import::importer::HobbesImporter;
use hobbes_import::report::{write_output, write_progress, PluginReport};
use hobbes_import::ImportResult;

const NUM_STEPS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // stdout carries the plugin protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let config = Config::from_env();

    let mut importer =
        HobbesImporter::new(config, args.server_url.clone(), args.session_id.clone());
    let mut report = PluginReport::new("Import Hobbes");

    match run_pipeline(&mut importer, &args).await {
        Ok((network_id, scenario_ids)) => {
            report.message = "Import complete".to_string();
            report.network_id = Some(network_id);
            report.scenario_ids = scenario_ids;
        }
        Err(e) => {
            error!("Import failed: {}", e);
            report.message = "An error has occurred".to_string();
            report.errors.push(e.to_string());
        }
    }
    report.warnings = importer.warnings.clone();
    report.files = importer.files.clone();

    println!("{}", report.to_xml());
    Ok(())
}

async fn run_pipeline(
    importer: &mut HobbesImporter,
    args: &Cli,
) -> ImportResult<(i64, Vec<i64>)> {
    write_progress(1, NUM_STEPS);
    importer.connect().await?;

    // one fetch serves both template inference and the data import
    write_progress(2, NUM_STEPS);
    write_output("Fetching Network");
    let feed = importer.hobbes.fetch_network().await?;

    write_progress(3, NUM_STEPS);
    let tpl = importer.ensure_template(&feed, args.template_id).await?;

    write_progress(4, NUM_STEPS);
    let network = importer
        .import_network_topology(&feed, &tpl, args.project_id)
        .await?;

    write_progress(5, NUM_STEPS);
    let scenario = importer
        .import_data(&feed, &tpl, &network, args.include_timeseries, args.data_nodes)
        .await?;

    Ok((network.id, vec![scenario.id]))
}
