mod json;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use cqlsink::{
    BatchOutput, Column, LogicalType, MemCatalog, MemSession, SinkTask, CONTACT_POINTS, KEYSPACE,
    TABLE,
};
use tabled::builder::Builder;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Replay a file of JSON records into an in-memory table and print the bound inserts.
#[derive(FromArgs)]
struct Args {
    /// keyspace of the target table
    #[argh(option, default = "String::from(\"sink\")")]
    keyspace: String,

    /// name of the target table
    #[argh(option)]
    table: String,

    /// columns of the target table, as `name:type,...`
    #[argh(option)]
    columns: String,

    /// file with one JSON record per line
    #[argh(positional)]
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_env("CQLSINK_LOG").unwrap_or_else(|_| EnvFilter::new("cqlsink=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
        .init();

    let args: Args = argh::from_env();
    let columns = parse_columns(&args.columns)?;
    let mut catalog = MemCatalog::new();
    catalog.create_table(&args.keyspace, &args.table, columns);

    let src = fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read `{}`", args.path.display()))?;
    let topic = args.path.file_stem().map_or_else(|| "records".into(), |s| s.to_string_lossy());
    let mut records = vec![];
    for (offset, line) in (0..).zip(src.lines()) {
        records.extend(json::parse_record(&topic, offset, line)?);
    }

    let properties = HashMap::from([
        (KEYSPACE.to_string(), args.keyspace.clone()),
        (TABLE.to_string(), args.table.clone()),
        (CONTACT_POINTS.to_string(), "127.0.0.1:9042".to_string()),
    ]);
    tracing::info!(path = %args.path.display(), records = records.len(), "replaying records");
    let mut task = SinkTask::new();
    task.start(&properties, |_| Ok(MemSession::new("cqlsink", catalog)))?;
    let output = task.put(records)?;
    task.stop()?;

    print_output(&output);
    Ok(())
}

/// Parses `name:type,...`. Commas inside a parameterized type such as `map<text, int>` do not
/// separate columns.
fn parse_columns(s: &str) -> anyhow::Result<Vec<Column>> {
    let mut columns = vec![];
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, c) in s.char_indices().chain([(s.len(), ',')]) {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                columns.push(parse_column(&s[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    Ok(columns)
}

fn parse_column(s: &str) -> anyhow::Result<Column> {
    let (name, ty) = s
        .split_once(':')
        .with_context(|| format!("invalid column `{s}`, expected `name:type`"))?;
    let ty = ty.trim().parse::<LogicalType>().with_context(|| format!("column `{name}`"))?;
    Ok(Column::new(name.trim(), ty))
}

fn print_output(output: &BatchOutput) {
    if let Some(stmt) = output.statements.first() {
        println!("{}", stmt.prepared().query());
        let mut builder = Builder::default();
        let columns = stmt.prepared().template().columns();
        builder.push_record(columns.iter().map(|c| c.name().to_string()));
        for stmt in &output.statements {
            builder.push_record(stmt.columns().map(|(_, value)| {
                value.map_or_else(|| "<unset>".to_string(), ToString::to_string)
            }));
        }
        println!("{}", builder.build());
    }

    if !output.rejected.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["index", "offset", "error"].map(String::from));
        for rejected in &output.rejected {
            builder.push_record([
                rejected.index.to_string(),
                rejected.offset.to_string(),
                rejected.error.to_string(),
            ]);
        }
        println!("{}", builder.build());
    }

    println!(
        "{} statements, {} rejected, {} skipped",
        output.statements.len(),
        output.rejected.len(),
        output.skipped
    );
}
