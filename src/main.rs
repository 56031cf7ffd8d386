use std::{
    io::{self, Write},
    process,
};

use clap::Parser;
use nagios_exporter::{
    cli::Args, config::Config, core::Collector, logger::LoggerManager, print_error, server,
};
use tracing::{debug, error, info};

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut cfg = Config::new(args.config.as_deref()).unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });
    args.apply(&mut cfg);
    if let Err(e) = cfg.check() {
        print_error!("{}", e);
        process::exit(1);
    }

    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!(
        "Starting nagios-exporter version {}...",
        env!("CARGO_PKG_VERSION")
    );
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.exporter);

    let collector = Collector::from_config(&cfg.exporter);

    if args.dump_metrics {
        let body = collector.render().await;
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(body.as_bytes()).and_then(|_| stdout.flush()) {
            error!("Failed to write metrics to stdout: {}", e);
            process::exit(1);
        }
        return;
    }

    if let Err(e) = server::serve(&cfg.server, collector, shutdown_signal()).await {
        error!("{}", e);
        process::exit(1);
    }
    info!("Shutdown complete");
}
