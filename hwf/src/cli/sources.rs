use std::path::PathBuf;

use clap::Args;
use hwf_common::error::Result;
use prettytable::{format, Cell, Row, Table};

use crate::cli::resolve_sources;

#[derive(Args, Debug)]
pub struct Sources {
    /// JSON file of source descriptors replacing the built-in list
    #[arg(long, value_name = "FILE")]
    pub sources: Option<PathBuf>,
}

impl Sources {
    pub fn run(&self) -> Result<()> {
        let sources = resolve_sources(self.sources.as_deref())?;
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Tool").style_spec("b"),
            Cell::new("Page").style_spec("b"),
            Cell::new("Saved as").style_spec("b"),
        ]));
        for source in &sources {
            table.add_row(Row::new(vec![
                Cell::new(&source.name).style_spec("Fb"),
                Cell::new(&source.page_url),
                Cell::new(source.save_name.as_deref().unwrap_or("(from URL)")),
            ]));
        }
        table.printstd();
        Ok(())
    }
}
