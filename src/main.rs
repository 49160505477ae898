use clap::Parser;
use serp_brief::{Pipeline, PipelineConfig, PipelineReport};
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match &args.config_file {
        Some(path) => match PipelineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };
    let config = args.apply_overrides(config.apply_env());

    if config.scrape.use_webdriver {
        ::log::info!(
            "Rendering pages via WebDriver at {} (set WEBDRIVER_URL to override)",
            config.render.webdriver_url
        );
    }

    let report = match Pipeline::new(config)
        .with_seed_urls(args.seed_urls.clone())
        .run(&args.query)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            ::log::error!("Run failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if report.shortfall {
        ::log::warn!(
            "Only {} results found for \"{}\"",
            report.result_set.len(),
            report.query
        );
    }

    match write_report(&args, &report) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("Failed to write report: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn write_report(args: &Args, report: &PipelineReport) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if args.stdout {
        println!("{json}");
        return Ok(());
    }

    let path = args.output_path();
    std::fs::write(&path, json)?;
    ::log::info!(
        "Wrote {} pages ({} failed) to {}",
        report.pages.success_count(),
        report.pages.failure_count(),
        path.display()
    );
    Ok(())
}
