use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempo_quantize::Sample;
use tempo_scheduler::SchedulerOptions;
use tempo_watch::{Sampler, Watch};
use tokio::sync::mpsc;

pub fn load_options(path: Option<&Path>, visible_throttle_ms: Option<f64>) -> Result<SchedulerOptions> {
    let mut options = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_options(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SchedulerOptions::default(),
    };
    if let Some(ms) = visible_throttle_ms {
        options = options.with_visible_throttle(ms);
    }
    Ok(options)
}

fn parse_options(raw: &str) -> Result<SchedulerOptions> {
    Ok(serde_json::from_str(raw)?)
}

/// Writes the watch's sample, then every change, until a final sample or `limit` lines.
///
/// Changes are queued with the wake they were scheduled with, so each line describes its own
/// value even when the watch has already moved on.
pub async fn follow<S, F, W>(
    watch: Watch<S>,
    limit: Option<usize>,
    json: bool,
    render: F,
    out: &mut W,
) -> Result<()>
where
    S: Sampler,
    S::Value: Serialize,
    F: Fn(&S::Value) -> String,
    W: Write,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    watch.subscribe_samples(move |sample: &Sample<S::Value>| {
        let _ = tx.send(sample.clone());
    });

    let mut printed = 0;
    let mut sample = watch.sample();
    loop {
        emit(out, &sample, json, &render)?;
        printed += 1;
        if sample.is_final() || limit.is_some_and(|limit| printed >= limit) {
            break;
        }
        sample = match rx.recv().await {
            Some(sample) => sample,
            None => break,
        };
    }
    tracing::debug!(printed, "done following");
    Ok(())
}

fn emit<V, F, W>(out: &mut W, sample: &Sample<V>, json: bool, render: &F) -> Result<()>
where
    V: Serialize,
    F: Fn(&V) -> String,
    W: Write,
{
    if json {
        writeln!(out, "{}", serde_json::to_string(sample)?)?;
    } else {
        writeln!(out, "{}", render(&sample.value))?;
    }
    Ok(())
}
