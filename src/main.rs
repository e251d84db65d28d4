// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! A simple interactive shell for the binder.
//!
//! Reads queries, binds them against a demo catalog (or a catalog file is a
//! future addition), and prints the result schema or the diagnostics.

use std::fs::File;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use lucent::binder::Binder;
use lucent::catalog::{Catalog, TableSymbol, Type};
use lucent::parser::parse_query;
use lucent::types::ScalarKind;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::EnvFilter, fmt};

/// Lucent: a semantic binder for a Kusto-style query language.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// File of queries to check, one per line.
    #[clap(short, long)]
    file: Option<String>,

    /// A single query to check.
    #[clap(short, long)]
    query: Option<String>,
}

fn demo_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::builder()
            .table(
                TableSymbol::new("StormEvents")
                    .column("StartTime", ScalarKind::DateTime)
                    .column("State", ScalarKind::String)
                    .column("EventType", ScalarKind::String)
                    .column("DamageProperty", ScalarKind::Long),
            )
            .table(
                TableSymbol::new("Population")
                    .column("State", ScalarKind::String)
                    .column("Pop", ScalarKind::Long),
            )
            .table(TableSymbol::new("Telemetry").open())
            .build(),
    )
}

fn check(catalog: &Arc<Catalog>, line: &str) {
    let block = match parse_query(line) {
        Ok(block) => block,
        Err(err) => {
            println!("parse error: {err}");
            return;
        }
    };
    let model = Binder::bind(&block, catalog.clone());
    let diagnostics = model.diagnostics();
    if diagnostics.is_empty() {
        let result = block
            .statements
            .last()
            .map(|s| model.result_type_of(s.id))
            .unwrap_or(Type::Void);
        match result {
            Type::Table(table) => println!("ok: {}", table.display_schema()),
            other => println!("ok: {other}"),
        }
    } else {
        for diagnostic in diagnostics {
            println!(
                "error at {}..{}: {}",
                diagnostic.span.start,
                diagnostic.span.end,
                diagnostic.message()
            );
        }
    }
}

fn interactive(catalog: Arc<Catalog>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history_path = dirs::cache_dir().map(|p| {
        let cache_dir = p.join("lucent");
        std::fs::create_dir_all(cache_dir.as_path()).ok();
        let history_path = cache_dir.join("history.txt");
        if !history_path.as_path().exists() {
            File::create(history_path.as_path()).ok();
        }
        history_path.into_boxed_path()
    });

    if let Some(ref history_path) = history_path {
        if let Err(err) = rl.load_history(history_path) {
            println!("No previous history. {err}");
        }
    }
    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if line.trim().is_empty() {
                    continue;
                }
                check(&catalog, &line);
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
            }
            Err(ReadlineError::Eof) => {
                println!("Exited");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }

    if let Some(ref history_path) = history_path {
        if let Err(err) = rl.save_history(history_path) {
            println!("Save history failed, {err}");
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let catalog = demo_catalog();

    if let Some(query) = args.query {
        check(&catalog, &query);
        return Ok(());
    }
    if let Some(file) = args.file {
        let text = std::fs::read_to_string(&file)?;
        info!("checking {file}");
        for line in text.lines() {
            if line.trim().is_empty() || line.trim_start().starts_with("//") {
                continue;
            }
            println!("> {line}");
            check(&catalog, line);
        }
        return Ok(());
    }
    interactive(catalog)
}
