use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbus_proto::Response;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Raw wire-format text, one result per line.
    Plain,
    Json,
    Table,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Plain
        }
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    status: &'a str,
    rest: &'a [String],
}

pub fn print_response(response: &Response, format: OutputFormat) {
    match format {
        OutputFormat::Plain => println!("{response}"),
        OutputFormat::Json => {
            let out = ResponseOutput {
                status: &response.status,
                rest: &response.rest,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STATUS", "PAYLOAD"])
                .add_row(vec![response.status.clone(), response.rest.join(", ")]);
            println!("{table}");
        }
    }
}

#[derive(Serialize)]
struct ObjectsOutput<'a> {
    objects: &'a [String],
}

pub fn print_objects(names: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Plain => {
            for name in names {
                println!("{name}");
            }
        }
        OutputFormat::Json => {
            let out = ObjectsOutput { objects: names };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OBJECT"]);
            for name in names {
                table.add_row(vec![name.clone()]);
            }
            println!("{table}");
        }
    }
}
