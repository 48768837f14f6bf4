//! ollamaprep - Main CLI Entry Point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use ollamaprep::{
    bootstrap::{Bootstrap, ServerState},
    cli::{Args, Commands, Verbosity},
    config::Config,
    display::Console,
    doctor::Doctor,
    errors::EXIT_CODE_SUCCESS,
    models::{OllamaClient, ServerApi},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match Config::load(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    };
    args.apply_overrides(&mut config);

    let verbosity = if args.quiet || args.verbose > 0 {
        args.verbosity()
    } else {
        Verbosity::from_config(&config.display.default_verbosity).unwrap_or(Verbosity::Normal)
    };
    ollamaprep::logging::init(verbosity);

    match args.command() {
        Commands::Run => run_bootstrap(config, verbosity).await,
        Commands::Doctor => run_doctor(config).await,
        Commands::Models => list_models(&config).await,
        Commands::Config { write } => show_config(&config, write),
    }
}

async fn run_bootstrap(config: Config, verbosity: Verbosity) -> Result<()> {
    if let Err(e) = config.validate() {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(e.exit_code());
    }

    let console = Console::new(
        verbosity,
        config.display.show_spinner,
        config.display.color_output,
    );

    let bootstrap = Bootstrap::new(config, console.clone())?;

    match bootstrap.run().await {
        Ok(report) => {
            if !report.model_listed() {
                console.warning(&format!("{} did not appear in the model list", report.model));
            }

            let server = match report.server {
                ServerState::Terminated(_) => "server stopped".to_string(),
                ServerState::LeftRunning(pid) => format!("server running (pid {})", pid),
            };
            console.result(&format!(
                "{} {} ready in {:.1}s, {}",
                "✓".green(),
                report.model.as_str().bold(),
                report.total_duration().as_secs_f64(),
                server
            ));
            std::process::exit(EXIT_CODE_SUCCESS);
        }
        Err(e) => {
            console.error(&e.to_string());
            if e.is_setup_needed() {
                eprintln!("\nInstall the prerequisites manually, then run ollamaprep again.");
            }
            std::process::exit(e.exit_code());
        }
    }
}

async fn run_doctor(config: Config) -> Result<()> {
    let doctor = Doctor::new(config)?;

    let report = doctor.run_checks().await?;
    report.print();

    std::process::exit(if report.is_healthy() { 0 } else { 1 });
}

async fn list_models(config: &Config) -> Result<()> {
    let client = OllamaClient::new(Some(config.ollama_url()))?;

    println!("\nChecking Ollama models at {}...\n", client.base_url());

    match client.list_models().await {
        Ok(models) => {
            if models.is_empty() {
                println!("No models installed.");
                println!("\nPull the lab model with:");
                println!("  ollamaprep");
            } else {
                println!("Available models:");
                for model in models {
                    println!("  • {}", model);
                }
            }
            println!();
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nIs Ollama running? Start with: ollama serve");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn show_config(config: &Config, write: bool) -> Result<()> {
    if write {
        let path = Config::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        config.save(&path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║ ollamaprep Configuration                              ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    println!("Server:");
    println!("  Binary:        {}", config.server.binary);
    println!("  Address:       {}", config.server.address());
    println!("  Model:         {}", config.server.model);
    println!("  Keep running:  {}", config.server.keep_running);
    println!();

    println!("Installer:");
    println!("  URL:           {}", config.installer.url);
    println!("  SHA-256 pin:   {}", config.installer.sha256.as_deref().unwrap_or("none"));
    println!("  Version pin:   {}", config.installer.version.as_deref().unwrap_or("latest"));
    println!();

    println!("Readiness:");
    println!("  Poll interval: {}ms", config.readiness.poll_interval_ms);
    println!("  Timeout:       {}s", config.readiness.timeout_secs);
    println!("  Settle delay:  {}s", config.readiness.settle_secs);
    println!();

    println!("Warmup:");
    println!("  Enabled:       {}", config.warmup.enabled);
    let candidates = config.warmup_script_candidates();
    if candidates.is_empty() {
        println!("  Script:        none");
    }
    for (i, path) in candidates.iter().enumerate() {
        let label = if i == 0 { "Script:" } else { "" };
        println!("  {:<14} {}", label, path.display());
    }
    println!();

    Ok(())
}
