//! Persistent service root commands.
//!
//! Provides `roots`, `canonical` and `remove`. None of them boot a service;
//! they only consult the providers.

use crate::error::CliError;
use crate::runner::CliRunner;
use steward::monitor::MonitorError;

/// List persistent services the providers can enumerate.
pub fn run_roots(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("roots");
    let registry = runner.create_registry()?;

    let roots = registry.persistent_services();
    if roots.is_empty() {
        println!(
            "No persistent services under {}",
            registry.system_home().display()
        );
    } else {
        let width = roots.iter().map(|(scheme, _)| scheme.len()).max().unwrap_or(0);
        for (scheme, name) in &roots {
            println!("{:width$}  {}", scheme, name, width = width);
        }
    }

    registry.shutdown();
    Ok(())
}

/// Print the canonical form of `name`, and whether a service lives there.
pub fn run_canonical(runner: &CliRunner, name: &str) -> Result<(), CliError> {
    runner.log_startup("canonical");
    let registry = runner.create_registry()?;

    let canonical = registry
        .get_canonical_service_name(name)?
        .ok_or_else(|| MonitorError::UnknownProtocol(name.to_string()))?;
    let exists = registry.providers().resolve_scheme(name)?.is_some();

    println!("{}", canonical);
    if !exists {
        println!("(no service exists there yet)");
    }

    registry.shutdown();
    Ok(())
}

/// Remove the durable root of `name`.
pub fn run_remove(runner: &CliRunner, name: &str) -> Result<(), CliError> {
    runner.log_startup("remove");
    let registry = runner.create_registry()?;

    registry.remove_persistent_service(name)?;
    println!("Removed {}", name);

    registry.shutdown();
    Ok(())
}
