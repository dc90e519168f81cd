use anyhow::Context;
use clap::Parser;
use fare_estimator::config::LogFormat;
use fare_estimator::core::etl::export_summary;
use fare_estimator::core::ConfigProvider;
use fare_estimator::utils::error::ErrorSeverity;
use fare_estimator::utils::{logger, validation::Validate};
use fare_estimator::{CliConfig, EtlEngine, FareError, FarePipeline, LocalStorage, Settings};

// conventional status for a process stopped by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Text => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting fare-estimator");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let settings = match Settings::resolve(&cli).and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => exit_with(e),
    };

    if settings.monitor {
        tracing::info!("🔍 Process monitoring enabled");
    }
    tracing::info!(
        input = settings.input_path(),
        output = settings.output_path(),
        workers = settings.workers,
        "Configuration resolved"
    );

    let metrics_file = settings.metrics_file.clone();
    let monitor_enabled = settings.monitor;
    let pipeline = match FarePipeline::new(LocalStorage::default(), settings) {
        Ok(pipeline) => pipeline,
        Err(e) => exit_with(e),
    };

    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight deliveries");
            shutdown.trigger();
        }
    });

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    let summary = match engine.run().await {
        Ok(summary) => summary,
        Err(e) => exit_with(e),
    };

    if let Some(path) = metrics_file {
        export_summary(&summary, &path)
            .await
            .with_context(|| format!("failed to write metrics to {}", path))?;
    }

    if summary.interrupted {
        tracing::warn!(
            "⚠️ Fare estimation interrupted after {}ms; {} estimates written",
            summary.elapsed_ms,
            summary.load.written
        );
        eprintln!(
            "⚠️ Interrupted: {} holds a partial result. Re-run to price every delivery.",
            summary.load.output_path
        );
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }

    tracing::info!("✅ Fare estimation completed in {}ms", summary.elapsed_ms);
    println!(
        "Fare estimation completed successfully. Results written to {}",
        summary.load.output_path
    );

    Ok(())
}

fn exit_with(e: FareError) -> ! {
    tracing::error!(
        "❌ Fare estimation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
