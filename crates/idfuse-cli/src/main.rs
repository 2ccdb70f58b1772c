mod commands;
mod logging;

use std::path::Path;
use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use idfuse_core::{compare, dataset, index, AppConfig, FusionEngine, Registry};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match idfuse_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Fuse { content }) => {
            if let Err(err) = run_fuse(&config, content) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Content) => {
            if let Err(err) = run_content(&config) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Scan) => {
            if let Err(err) = run_scan(&config) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Info) => {
            if let Err(err) = run_info(&config) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Compare {
            ds_a,
            col_a,
            ds_b,
            col_b,
            export,
        }) => {
            if let Err(err) = run_compare(&config, &ds_a, &col_a, &ds_b, &col_b, export) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::GenIds { ds_name }) => {
            if let Err(err) = run_gen_ids(&config, &ds_name) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::FindName { name }) => {
            if let Err(err) = run_find_name(&config, &name) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            match Registry::load(Path::new(&config.registry_path)) {
                Ok(registry) => {
                    for cfg in registry.all() {
                        println!(
                            "{}: enabled={} src_id={} file={}",
                            cfg.ds_name, cfg.enabled, cfg.src_id, cfg.filename
                        );
                    }
                }
                Err(err) => error!("Error loading registry: {}", err),
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn load_engine(config: &AppConfig) -> Result<FusionEngine, idfuse_core::Error> {
    let registry = Registry::load(Path::new(&config.registry_path))?;
    Ok(FusionEngine::new(config.clone(), registry))
}

fn run_fuse(config: &AppConfig, with_content: bool) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let result = engine.fuse(with_content)?;

    println!();
    info!(
        "Reload: {}, Scan: {}, Merge: {}",
        format!("{:.2}s", result.reload_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.merge_duration.as_secs_f64()).green(),
    );
    info!(
        "{} records reloaded, {} datasets scanned, {} names indexed",
        format!("{}", result.reloaded_records).cyan(),
        format!("{}", result.datasets_loaded).cyan(),
        format!("{}", result.names_indexed).cyan(),
    );
    info!(
        "{} rows merged into {} master records",
        format!("{}", result.rows_merged).red(),
        format!("{}", result.master_records).red(),
    );

    Ok(())
}

fn run_content(config: &AppConfig) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let updated = engine.refresh_content()?;
    info!("Content aggregated for {} master records", updated);
    Ok(())
}

fn run_scan(config: &AppConfig) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let pass = engine.scan()?;
    info!(
        "{} names indexed from {} (fid, name) pairs; listing written to {}",
        format!("{}", pass.index.len()).cyan(),
        format!("{}", pass.listing.len()).cyan(),
        config.listing_path,
    );
    Ok(())
}

fn run_info(config: &AppConfig) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let stats = engine.info()?;
    println!("src_id counter:");
    for (src_id, count) in stats {
        println!("{},{}", src_id, count);
    }
    Ok(())
}

fn run_compare(
    config: &AppConfig,
    ds_a: &str,
    col_a: &str,
    ds_b: &str,
    col_b: &str,
    export: bool,
) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let registry = engine.registry();

    let cfg_a = registry
        .get(ds_a)
        .ok_or_else(|| idfuse_core::Error::Registry(format!("unknown dataset '{}'", ds_a)))?;
    let cfg_b = registry
        .get(ds_b)
        .ok_or_else(|| idfuse_core::Error::Registry(format!("unknown dataset '{}'", ds_b)))?;

    let a = dataset::Dataset::load(cfg_a)?;
    let b = dataset::Dataset::load(cfg_b)?;
    let cmp = compare::compare_columns(&a, col_a, &b, col_b)?;

    println!(
        "counter of A={}, B={}, A+B={}, A&B={}, A-B={}, B-A={}",
        cmp.a_count,
        cmp.b_count,
        cmp.union.len(),
        cmp.intersection.len(),
        cmp.a_minus_b.len(),
        cmp.b_minus_a.len(),
    );
    println!("A+B={:?}\n\nA&B={:?}\n\nA-B={:?}\n\nB-A={:?}", cmp.union, cmp.intersection, cmp.a_minus_b, cmp.b_minus_a);

    if export {
        cmp.export(Path::new(&config.compare_dir))?;
        info!("Comparison sets written to {}", config.compare_dir);
    }

    Ok(())
}

fn run_gen_ids(config: &AppConfig, ds_name: &str) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let cfg = engine
        .registry()
        .get(ds_name)
        .ok_or_else(|| idfuse_core::Error::Registry(format!("unknown dataset '{}'", ds_name)))?;
    let ds = dataset::Dataset::load(cfg)?;
    for id in ds.generate_new_ids(&cfg.col_name) {
        println!("{}", id);
    }
    Ok(())
}

fn run_find_name(config: &AppConfig, name: &str) -> Result<(), idfuse_core::Error> {
    let engine = load_engine(config)?;
    let datasets = engine.load_datasets()?;
    let matches = index::find_name(engine.registry(), &datasets, name);
    if matches.is_empty() {
        println!("No record uses name '{}'", name);
        return Ok(());
    }
    for (ds_name, fid) in matches {
        println!("{},{} ({})", fid, name, ds_name);
    }
    Ok(())
}
