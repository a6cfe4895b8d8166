//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use glimpse::{
    EngineConfig, Frame, HttpTransport, LoopbackTransport, OptionValue, RecognitionObserver,
    RecognitionResult, RecognitionSession, RecognitionTransport, RequestId, SessionStats,
};
use glimpseconf::{ConfigSources, GlimpseConfig};
use serde_json::json;
use tokio::sync::mpsc;

/// Latency of the loopback transport, roughly a fast LAN round trip.
const LOOPBACK_LATENCY: Duration = Duration::from_millis(40);

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "heic"];

/// Forwards every outcome to the printing task.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<(RequestId, RecognitionResult)>,
}

impl RecognitionObserver for ChannelObserver {
    fn on_result(&self, request_id: RequestId, result: RecognitionResult) {
        let _ = self.tx.send((request_id, result));
    }
}

/// Merge `--option key=value` flags into the pass-through options.
pub fn apply_cli_options(config: &mut GlimpseConfig, raw: &[String]) -> Result<()> {
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("Invalid --option '{}': expected KEY=VALUE", entry);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid --option '{}': empty key", entry);
        }
        config
            .options
            .insert(key.to_string(), OptionValue::parse(value.trim()));
    }
    Ok(())
}

/// Print the effective config as TOML, with its sources as comments
pub fn show_config(config: &GlimpseConfig, sources: &ConfigSources) -> Result<()> {
    if sources.files.is_empty() {
        println!("# no config files found, using defaults");
    }
    for file in &sources.files {
        println!("# file: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env: {}", var);
    }
    println!("{}", config.to_toml()?);
    Ok(())
}

fn build_transport(config: &GlimpseConfig, loopback: bool) -> Arc<dyn RecognitionTransport> {
    if loopback {
        Arc::new(LoopbackTransport::new(LOOPBACK_LATENCY))
    } else {
        Arc::new(HttpTransport::new(&config.service.endpoint))
    }
}

fn engine_config(config: &GlimpseConfig, loopback: bool) -> EngineConfig {
    let engine = EngineConfig::from_conf(config);
    if loopback && engine.client_id.is_empty() {
        // loopback never checks credentials
        return EngineConfig {
            client_id: Arc::from("loopback"),
            ..engine
        };
    }
    engine
}

/// Upper bound on how long one request can take, retries included.
fn request_budget(engine: &EngineConfig) -> Duration {
    let attempts = engine.retry.max_attempts.max(1);
    let backoff: Duration = (1..attempts).map(|n| engine.retry.backoff_for_retry(n)).sum();
    engine.request_timeout * attempts + backoff + Duration::from_secs(1)
}

fn outcome_json(request_id: RequestId, result: &RecognitionResult) -> serde_json::Value {
    json!({
        "request_id": request_id.0,
        "result": result,
    })
}

/// Recognize one image file
pub async fn recognize(config: &GlimpseConfig, loopback: bool, image: &Path) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read image {}", image.display()))?;

    let engine = engine_config(config, loopback);
    let budget = request_budget(&engine);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer = Arc::new(ChannelObserver { tx });
    let session = RecognitionSession::new(engine, build_transport(config, loopback))?
        .with_observer(&observer);

    session.start()?;
    let id = session.submit_image(bytes)?;

    let (delivered, result) = tokio::time::timeout(budget, rx.recv())
        .await
        .context("Timed out waiting for a recognition result")?
        .context("Session closed without a result")?;
    debug_assert_eq!(delivered, id);

    println!("{}", serde_json::to_string_pretty(&outcome_json(delivered, &result))?);
    session.terminate()?;

    if let RecognitionResult::Failure { kind, message } = result {
        bail!("Recognition failed ({}): {}", kind, message);
    }
    Ok(())
}

/// Image files in `dir`, sorted by name.
fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Feed a directory of images through a continuous session
pub async fn scan(config: &GlimpseConfig, loopback: bool, dir: &Path, fps: f64) -> Result<()> {
    if !(fps.is_finite() && fps > 0.0) {
        bail!("--fps must be a positive number, got {}", fps);
    }
    let files = image_files(dir)?;
    if files.is_empty() {
        bail!("No images found in {}", dir.display());
    }

    let engine = engine_config(config, loopback).with_mode(glimpse::RecognitionMode::Continuous);
    let budget = request_budget(&engine);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer = Arc::new(ChannelObserver { tx });
    let session = RecognitionSession::new(engine, build_transport(config, loopback))?
        .with_observer(&observer);
    session.start()?;

    let printed = Arc::new(AtomicU64::new(0));
    let printer = {
        let printed = Arc::clone(&printed);
        tokio::spawn(async move {
            while let Some((id, result)) = rx.recv().await {
                println!("{}", outcome_json(id, &result));
                printed.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    tracing::info!(frames = files.len(), fps, "Starting scan");

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps));
    let started = tokio::time::Instant::now();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut interrupted = false;
    for (index, path) in files.iter().enumerate() {
        tokio::select! {
            _ = &mut ctrl_c => {
                interrupted = true;
                break;
            }
            _ = ticker.tick() => {}
        }

        let image = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read frame {}", path.display()))?;
        let frame = Frame::new(index as u64 + 1, started.elapsed(), image);
        let admission = session.submit_frame(frame)?;
        tracing::debug!(frame = %path.display(), admission = ?admission, "Frame offered");
    }

    if !interrupted {
        wait_for_idle(&session, budget).await;
    }

    session.terminate()?;
    let stats = session.stats();

    // every dispatched request gets exactly one outcome, cancellations included
    let drained = tokio::time::timeout(Duration::from_secs(1), async {
        while printed.load(Ordering::SeqCst) < stats.requests_dispatched {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Gave up waiting for the last outcomes");
    }

    drop(session);
    drop(observer);
    let _ = printer.await;

    print_stats(&stats)?;
    Ok(())
}

/// Wait until nothing is in flight, or `budget` runs out.
async fn wait_for_idle(session: &RecognitionSession, budget: Duration) {
    let deadline = tokio::time::Instant::now() + budget;
    while session.snapshot().in_flight.is_some() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn print_stats(stats: &SessionStats) -> Result<()> {
    eprintln!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}
