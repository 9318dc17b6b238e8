use clap::Parser;
use page_verify::{builtin, Config, Params, Runner};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "page-verify")]
#[command(about = "Scripted browser verification against a running site")]
#[command(version)]
struct Cli {
    /// Scenario files to run, in order
    configs: Vec<PathBuf>,

    /// Built-in scenario to run (default: rss-prompt when no files are given)
    #[arg(short, long, value_name = "NAME")]
    scenario: Vec<String>,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Origin of the site under test (shorthand for -P base_url=URL)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Validate scenarios without launching a browser
    #[arg(long)]
    check: bool,

    /// List built-in scenarios and exit
    #[arg(long)]
    list: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> page_verify::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    // RUST_LOG, when set, refines the level picked by -v/-q.
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    if cli.list {
        for name in builtin::names() {
            let marker = if name == builtin::DEFAULT { " (default)" } else { "" };
            println!("{}{}", name, marker);
        }
        return Ok(());
    }

    let mut params = Params::from_args(&cli.params)?;
    if let Some(ref base_url) = cli.base_url {
        params = params.set("base_url", base_url.trim_end_matches('/'));
    }

    let configs = load_configs(&cli, &params)?;

    if cli.check {
        for config in &configs {
            print_summary(config);
        }
        return Ok(());
    }

    let mut failed = 0;
    for mut config in configs {
        if cli.headed {
            config.browser.headless = false;
        }
        println!("Running: {}", config.name);

        // One browser per scenario so cookies never leak between them.
        let mut runner = match Runner::new(&config.browser).await {
            Ok(runner) => runner,
            Err(e) => {
                failed += 1;
                println!("✗ Failed");
                println!("  Error: could not launch browser: {}", e);
                println!();
                continue;
            }
        };
        let outcome = runner.run(&config).await;
        if let Err(e) = runner.close().await {
            tracing::warn!("failed to close browser: {}", e);
        }

        match outcome {
            Ok(report) => {
                println!("✓ Passed");
                println!("  Steps: {}", report.steps_executed);
                println!("  Duration: {}ms", report.duration_ms);
                for shot in &report.screenshots {
                    println!("  Screenshot: {}", shot.display());
                }
            }
            Err(e) => {
                failed += 1;
                println!("✗ Failed");
                println!("  Error: {}", e);
            }
        }
        println!();
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn load_configs(cli: &Cli, params: &Params) -> page_verify::Result<Vec<Config>> {
    let mut configs = Vec::new();
    for path in &cli.configs {
        configs.push(Config::load_with_params(path, params)?);
    }
    for name in &cli.scenario {
        configs.push(builtin::load(name, params)?);
    }
    if configs.is_empty() {
        configs.push(builtin::load(builtin::DEFAULT, params)?);
    }
    Ok(configs)
}

fn print_summary(config: &Config) {
    println!("Config valid: {}", config.name);
    println!("  Target: {}", config.target.url);
    println!("  Steps: {}", config.steps.len());
    for path in config.screenshot_paths() {
        println!("  Screenshot: {}", path);
    }
    if !config.params.is_empty() {
        println!("  Parameters: {}", config.params.len());
        let mut names: Vec<_> = config.params.keys().collect();
        names.sort();
        for name in names {
            let def = &config.params[name];
            let req = if def.required { " (required)" } else { "" };
            let desc = def.description.as_deref().unwrap_or("");
            println!("    - {}{}: {}", name, req, desc);
        }
    }
}
