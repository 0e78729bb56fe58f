use importbox::config::Config;
use importbox::humanize::ByteSize;
use importbox::import::{ImportRequest, ImportResult, Importer};
use importbox::observability::LogSink;
use importbox::source::http::HttpSource;
use importbox::storage::StorageUsage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ImportArgs;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn import(config: &Config, args: ImportArgs) -> Result<(), AnyError> {
    let storage = config.storage.build_client()?;
    let source = HttpSource::new(config.source.http_config())?;

    let importer = Importer::new(Arc::new(source), Arc::new(storage.clone()))
        .with_config(&config.import)
        .with_usage(Arc::new(StorageUsage::new(storage)));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let request = ImportRequest::new(args.reference, args.prefix);
    let result = importer.run(&request, Some(&LogSink), &cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &ImportResult) {
    println!(
        "{} import: {} imported, {} skipped, {} failed ({})",
        result.kind,
        result.imported,
        result.skipped,
        result.failed(),
        ByteSize(result.total_bytes)
    );
    for item in &result.items {
        println!("  + {} ({})", item.key, ByteSize(item.size_bytes));
    }
    for error in &result.errors {
        println!("  ! {}: {}", error.title, error.error);
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, stopping after the current item");
    cancel.cancel();
}
