use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lanecast_broadcast::{run_publisher, Hub, WsServer};
use lanecast_frame::{Advance, DecodeError, FrameStore, SegmentDecoder};
use lanecast_source::ByteSource;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::cmd::ServeArgs;
use crate::config::{ServeConfig, Settings};
use crate::exit::{broadcast_error, decode_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};

/// How long shutdown waits for a decode thread stuck in a blocking read.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeOutcome {
    Cancelled,
    Ended,
}

pub fn run(args: ServeArgs, config: Option<&Path>) -> CliResult<i32> {
    let mut settings = Settings::load(config)?;
    settings.apply_serve(&args);
    let serve = settings.serve_config(&args.modes)?;
    let source = serve.source.open()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let result = runtime.block_on(serve_until_cancelled(serve, source, cancel));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn serve_until_cancelled(
    config: ServeConfig,
    source: Box<dyn ByteSource + Send>,
    cancel: CancellationToken,
) -> CliResult<i32> {
    let store = Arc::new(FrameStore::new(config.modes));
    let updates = Arc::new(Notify::new());
    let hub = Hub::default();

    let server = WsServer::bind(config.listen, &config.path, hub.clone())
        .await
        .map_err(|err| broadcast_error("websocket bind failed", err))?;
    let server_task = tokio::spawn(server.run(cancel.clone()));
    let publisher_task = tokio::spawn(run_publisher(
        Arc::clone(&store),
        hub,
        config.policy,
        Arc::clone(&updates),
        cancel.clone(),
    ));

    let mut decode_task = tokio::task::spawn_blocking({
        let store = Arc::clone(&store);
        let updates = Arc::clone(&updates);
        let cancel = cancel.clone();
        move || decode_loop(source, &store, &updates, &cancel)
    });

    // A blocking read cannot observe cancellation, so the decode thread is
    // not joined once Ctrl-C arrives.
    let decoded = tokio::select! {
        joined = &mut decode_task => joined
            .map_err(|err| CliError::new(INTERNAL, format!("decode loop panicked: {err}")))?,
        _ = cancel.cancelled() => Ok(DecodeOutcome::Cancelled),
    };

    let outcome = match decoded {
        Ok(DecodeOutcome::Ended) => {
            info!("source exhausted; serving last frame until interrupted");
            cancel.cancelled().await;
            Ok(SUCCESS)
        }
        Ok(DecodeOutcome::Cancelled) => Ok(SUCCESS),
        Err(err) => {
            error!(error = %err, "decode loop stopped");
            cancel.cancel();
            Err(decode_error("source failed", err))
        }
    };

    let stats = publisher_task
        .await
        .map_err(|err| CliError::new(INTERNAL, format!("publisher panicked: {err}")))?;
    server_task
        .await
        .map_err(|err| CliError::new(INTERNAL, format!("websocket server panicked: {err}")))?
        .map_err(|err| broadcast_error("websocket server failed", err))?;

    info!(
        sequence = store.sequence(),
        published = stats.published,
        "shutdown complete"
    );
    outcome
}

fn decode_loop(
    source: Box<dyn ByteSource + Send>,
    store: &FrameStore,
    updates: &Notify,
    cancel: &CancellationToken,
) -> Result<DecodeOutcome, DecodeError> {
    let mut decoder = SegmentDecoder::new(source);

    while !cancel.is_cancelled() {
        match decoder.advance()? {
            Advance::More(channel) => {
                if let Some(record) = decoder.committed() {
                    let sequence = store.commit(record);
                    trace!(channel, sequence, "frame updated");
                    updates.notify_one();
                }
            }
            Advance::EndOfStream => {
                let stats = decoder.stats();
                debug!(
                    bytes = stats.bytes,
                    commits = stats.commits,
                    malformed = stats.malformed,
                    "source ended"
                );
                return Ok(DecodeOutcome::Ended);
            }
        }
    }

    Ok(DecodeOutcome::Cancelled)
}

fn install_ctrlc_handler(cancel: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
