//! trustseed CLI entry point.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use trustseed_components::{Driver, TaskContext};
use trustseed_core::{log, term, APP_NAME, VERSION};
use trustseed_types::SetupError;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    term::configure_colors();

    let _guard = match log::init(cli.log_level(), cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            println!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    match execute(&cli).await {
        Ok(Some(secrets_path)) => print_next_steps(&secrets_path),
        Ok(None) => {}
        Err(e) => {
            println!("{} {:#}", "Error:".red().bold(), e);
            let code = e.downcast_ref::<SetupError>().map(SetupError::exit_code).unwrap_or(1);
            std::process::exit(code);
        }
    }
}

/// Run the setup; returns the secret document path when tasks ran.
async fn execute(cli: &Cli) -> Result<Option<PathBuf>> {
    let driver = Driver::new();
    if cli.list_tasks {
        print!("{}", driver.plan());
        return Ok(None);
    }

    tracing::debug!("{} {} starting", APP_NAME, VERSION);
    let config = cli.setup_config()?;
    tracing::info!(
        "Preparing security material in {} with the {} backend",
        config.state_dir.display(),
        config.backend
    );

    let mut ctx = TaskContext::new(config)?;
    driver.run(&mut ctx).await?;

    Ok(Some(ctx.store.path().to_path_buf()))
}

fn print_next_steps(secrets_path: &std::path::Path) {
    println!();
    println!("Wrote security settings to {}", secrets_path.display().to_string().cyan());
    println!("Include them in your playbook runs:");
    println!(
        "  {}",
        format!("ansible-playbook your_playbook.yml -e @{}", secrets_path.display()).cyan()
    );
}
