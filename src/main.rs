// Main entry point for xmlreport

use anyhow::Result;
use clap::Parser;
use tracing::info;

use xmlreport::cli::{Cli, Commands};
use xmlreport::commands::{self, CommandContext, ExitStatus};
use xmlreport::config::Config;
use xmlreport::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting xmlreport v{}", env!("CARGO_PKG_VERSION"));
    }

    let loaded = Config::load();

    if cli.config {
        return commands::handle_show_config(&cli, loaded.as_ref());
    }

    if let Some(config_file) = &cli.init_config {
        return commands::handle_init_config(config_file);
    }

    if let Some(shell_type) = &cli.completion {
        return handle_completion(shell_type);
    }

    let config = loaded.unwrap_or_default();
    let status = match &cli.command {
        Some(Commands::Types(args)) => {
            commands::handle_types(args)?;
            ExitStatus::Success
        }
        Some(Commands::Parse(args)) => {
            let ctx = CommandContext::new(&cli, &config)?;
            commands::handle_parse(args, &ctx).await?
        }
        Some(Commands::Watch(args)) => {
            let ctx = CommandContext::new(&cli, &config)?;
            commands::handle_watch(args, &ctx).await?
        }
        Some(Commands::Listen(args)) => {
            let ctx = CommandContext::new(&cli, &config)?;
            commands::handle_listen(args, &ctx).await?
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            ExitStatus::Success
        }
    };

    if status != ExitStatus::Success {
        std::process::exit(status.code());
    }
    Ok(())
}

fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let shell = match shell_type {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        _ => {
            eprintln!("Error: Unsupported shell type '{}'", shell_type);
            eprintln!("Supported shells: bash, zsh, fish, elvish, powershell");
            return Err(anyhow::anyhow!("Unsupported shell type"));
        }
    };

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
    Ok(())
}
