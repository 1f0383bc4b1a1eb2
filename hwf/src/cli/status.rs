use clap::Args;
use colored::Colorize;
use hwf_common::config::Config;
use hwf_common::error::Result;
use hwf_core::VersionLedger;
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct Status;

impl Status {
    pub fn run(&self, config: &Config) -> Result<()> {
        let ledger = VersionLedger::new(config.ledger_path());
        let entries = ledger.entries()?;
        if entries.is_empty() {
            println!("{}", "No tools recorded yet".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Tool").style_spec("b"),
            Cell::new("Version").style_spec("b"),
        ]));
        for entry in &entries {
            table.add_row(Row::new(vec![
                Cell::new(&entry.name).style_spec("Fb"),
                Cell::new(&entry.version),
            ]));
        }
        table.printstd();
        println!(
            "{} tool(s) recorded in {}",
            entries.len(),
            ledger.path().display()
        );
        Ok(())
    }
}
