#[macro_use]
extern crate slog;

use babydb::store::{primary_key, secondary_key, Manifest};
use babydb::{Config, Engine, Error, PrimaryKeyIndex, SecondaryValueIndex, SledEngine};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use slog::Logger;
use std::path::{Path, PathBuf};

fn main() -> Result<(), failure::Error> {
    let logger = babydb::get_default_logger();

    let matches = App::new("babydb-index")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Inspect indexes persisted by babydb")
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("RON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Store directory, overrides the configuration")
                .takes_value(true),
        )
        .subcommand(
            SubCommand::with_name("dump-table")
                .about("Print a table's row ids in order")
                .arg(Arg::with_name("TABLE-ID").required(true)),
        )
        .subcommand(
            SubCommand::with_name("dump-index")
                .about("Print a secondary index's values and rows in order")
                .arg(Arg::with_name("INDEX-ID").required(true)),
        )
        .subcommand(SubCommand::with_name("check").about("Verify every persisted index"))
        .get_matches();

    let config = load_config(&matches)?;
    info!(logger, "DATA-DIR: {:?}", config.data_dir);
    let engine = SledEngine::open(&config.data_dir)?;

    match matches.subcommand() {
        ("dump-table", Some(sub)) => dump_table(&engine, sub.value_of("TABLE-ID").unwrap_or(""))?,
        ("dump-index", Some(sub)) => dump_index(&engine, sub.value_of("INDEX-ID").unwrap_or(""))?,
        ("check", Some(_)) => check(&engine, &logger)?,
        _ => unreachable!("clap requires a subcommand"),
    }
    Ok(())
}

fn load_config(matches: &ArgMatches) -> babydb::Result<Config> {
    let mut config = match matches.value_of("config") {
        Some(path) => Config::from_file(Path::new(path))?,
        None => Config::default(),
    };
    if let Some(dir) = matches.value_of("data-dir") {
        config.data_dir = PathBuf::from(dir);
    }
    Ok(config)
}

fn dump_table(engine: &SledEngine, table_id: &str) -> babydb::Result<()> {
    let bytes = engine
        .get(&primary_key(table_id))?
        .ok_or_else(|| Error::UnknownTable(table_id.to_owned()))?;
    for row in PrimaryKeyIndex::deserialize_or_empty(&bytes)?.ascend() {
        println!("{}", row);
    }
    Ok(())
}

fn dump_index(engine: &SledEngine, index_id: &str) -> babydb::Result<()> {
    let bytes = engine
        .get(&secondary_key(index_id))?
        .ok_or_else(|| Error::UnknownIndex(index_id.to_owned()))?;
    if bytes.is_empty() {
        return Ok(());
    }
    for (value, rows) in SecondaryValueIndex::deserialize(&bytes)?.ascend() {
        let rows: Vec<String> = rows.iter().map(ToString::to_string).collect();
        println!("{}\t{}", value, rows.join(","));
    }
    Ok(())
}

fn check(engine: &SledEngine, logger: &Logger) -> babydb::Result<()> {
    let mut tables = 0;
    let mut indexes = 0;
    for manifest in Manifest::load_all(engine)? {
        let slog = logger.new(o!("table" => manifest.table_id.clone()));
        let bytes = engine
            .get(&primary_key(&manifest.table_id))?
            .ok_or_else(|| Error::Message(format!("{}: primary index missing", manifest.table_id)))?;
        let primary = PrimaryKeyIndex::deserialize_or_empty(&bytes).map_err(|e| {
            error!(slog, "Primary index is unreadable"; "error" => %e);
            e
        })?;
        debug!(slog, "Primary index ok"; "rows" => primary.len());
        tables += 1;

        for (index_id, kind) in &manifest.indexes {
            let bytes = engine
                .get(&secondary_key(index_id))?
                .ok_or_else(|| Error::Message(format!("{}: index missing", index_id)))?;
            let index = SecondaryValueIndex::deserialize_or_empty(*kind, &bytes).map_err(|e| {
                error!(slog, "Secondary index is unreadable"; "index" => index_id, "error" => %e);
                e
            })?;
            debug!(slog, "Secondary index ok"; "index" => index_id, "values" => index.len());
            indexes += 1;
        }
    }
    println!("ok: {} tables, {} indexes", tables, indexes);
    Ok(())
}
