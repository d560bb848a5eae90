use metrics_exporter_prometheus::PrometheusHandle;
use requirement_alert::error::AppError;
use requirement_alert::notify::{NotifyError, SmtpNotifier};
use requirement_alert::store::{InMemoryRecordStore, SHOPS_COLLECTION};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the record store, preloading shops when a seed file is configured.
pub(crate) fn build_store(shops_seed: Option<&Path>) -> Result<InMemoryRecordStore, AppError> {
    let store = InMemoryRecordStore::new();
    if let Some(path) = shops_seed {
        let reader = BufReader::new(File::open(path)?);
        let loaded = store.seed_from_reader(SHOPS_COLLECTION, reader)?;
        info!(path = %path.display(), loaded, "shops seeded");
    }
    Ok(store)
}

/// Probe the SMTP account once, logging the result.
pub(crate) async fn verify_notifier(notifier: Arc<SmtpNotifier>) -> Result<(), AppError> {
    settle_probe(tokio::task::spawn_blocking(move || notifier.verify())).await
}

/// Await a blocking SMTP probe. Every failure, a panicked probe included, is logged here.
async fn settle_probe(probe: JoinHandle<Result<(), NotifyError>>) -> Result<(), AppError> {
    let outcome = probe.await.map_err(|err| {
        error!(error = %err, "smtp verification task failed");
        std::io::Error::other(err)
    })?;
    match outcome {
        Ok(()) => {
            info!("smtp ready");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "smtp verification failed");
            Err(err.into())
        }
    }
}
