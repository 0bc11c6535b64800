//! Catalog inspection command.

use crate::error::CliError;
use crate::runner::CliRunner;

/// Print the assembled catalogs, excluded entries and scheme table.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("catalog");
    let registry = runner.create_registry()?;

    println!("Implementation Catalogs");
    println!("=======================");
    println!();
    print!("{}", registry.catalog_summary());

    registry.shutdown();
    Ok(())
}
