mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use zr_core::config::Config;

fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting zoomreel {}", env!("CARGO_PKG_VERSION"));
    zr_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick levels from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "zoomreel=trace,zr_server=trace,zr_av=trace,zr_db=debug,zr_core=debug,tower_http=debug"
                .to_string()
        } else {
            "zoomreel=info,zr_server=info,zr_av=info,zr_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Render { input, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(render(&input, &output, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::GenerateSecret => {
            println!("{}", zr_server::auth::generate_secret());
            Ok(())
        }
        Commands::Version => {
            println!("zoomreel {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn render(input: &Path, output: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);

    if !input.is_file() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let tools = zr_av::ToolRegistry::discover(&config.tools);
    let started = std::time::Instant::now();

    zr_av::render_zoompan(
        &tools,
        input,
        output,
        &config.encoding,
        Duration::from_secs(config.jobs.timeout_secs),
        None,
    )
    .await
    .with_context(|| format!("rendering {}", input.display()))?;

    println!(
        "Wrote {} in {:.1}s",
        output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    println!("Checking external tools...\n");

    let tools = zr_av::ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is missing; install it or set tools.ffmpeg_path")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("reading {}", p.display()))?;
            let mut config = Config::from_json(&contents)?;
            config.apply_env();
            println!("✓ Configuration parses");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            load_config(None)
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Public URL: {}", config.public_base_url());
    println!("  Uploads: {}", config.storage.uploads_dir.display());
    println!("  Outputs: {}", config.storage.outputs_dir.display());
    println!(
        "  Workers: {} running, {} queued",
        config.jobs.max_concurrent, config.jobs.max_queued
    );
    println!("  Generation gated: {}", config.auth.require_for_generate);

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ No warnings");
    } else {
        for w in &warnings {
            println!("  ! {w}");
        }
    }

    Ok(())
}
