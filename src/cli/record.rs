//! CLI handler for a recording run.
//!
//! Records until Ctrl-C (or the requested duration), then shows conversion
//! progress until every file has reached the output folder.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{debug, info};

use super::args::RecordCliArgs;
use crate::audio::{AudioBackend, CpalBackend};
use crate::config::Config;
use crate::error::SessionError;
use crate::session::{format_size, Advisory, ConversionTask, OutputArtifact, RecordingSession};

const TICK: Duration = Duration::from_millis(500);

pub async fn handle_record_command(args: RecordCliArgs) -> Result<()> {
    let config = Config::load()?;
    let channels = config.session_channels();
    debug!(
        "Preset '{}' has {} channel(s)",
        config.selected_preset,
        channels.len()
    );

    let working_folder = config.storage.recording_folder();
    let final_folder = config.storage.output_folder.clone();

    let mut session = RecordingSession::new(CpalBackend::new(), config.encoder_settings())
        .with_advisories(Box::new(|advisory: &Advisory| {
            eprintln!("{}", advisory.message())
        }));
    let artifacts = session
        .start_session(&channels, &working_folder)
        .await
        .context("Failed to start recording")?;
    if artifacts.is_empty() {
        return Ok(());
    }

    println!("Recording {} channel(s):", artifacts.len());
    for artifact in &artifacts {
        println!("  {:<20} -> {}", artifact.channel.name, artifact.path.display());
    }
    println!("Press Ctrl-C to stop.");

    wait_while_recording(&mut session, args.duration).await?;

    let task = session
        .stop_session(&final_folder)
        .context("Failed to stop recording")?;
    let artifacts = match follow_conversion(task).await {
        Ok(artifacts) => artifacts,
        Err(SessionError::EncoderUnavailable(e)) => {
            println!("{}", e);
            println!("Raw recordings were kept in {}", working_folder.display());
            return Ok(());
        }
        Err(e) => return Err(e).context("Recording finished with errors"),
    };

    println!("Saved:");
    for artifact in artifacts {
        println!("  {} ({})", artifact.path.display(), artifact.size_display());
    }
    Ok(())
}

async fn wait_while_recording<B: AudioBackend>(
    session: &mut RecordingSession<B>,
    duration: Option<u64>,
) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.red} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let deadline = async {
        match duration {
            Some(secs) => sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let mut ticker = interval(TICK);

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Stop requested");
                break;
            }
            _ = &mut deadline => {
                debug!("Recording duration reached");
                break;
            }
            _ = ticker.tick() => {
                let total: u64 = session.artifacts().iter().map(|a| a.size_bytes).sum();
                let elapsed = session.elapsed().unwrap_or_default();
                spinner.set_message(format!(
                    "Recording {}  {}",
                    format_elapsed(elapsed),
                    format_size(total)
                ));
            }
        }
    }

    spinner.finish_and_clear();
    Ok(())
}

async fn follow_conversion(task: ConversionTask) -> Result<Vec<OutputArtifact>, SessionError> {
    let status = task.status();
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
    {
        pb.set_style(style.progress_chars("━╸━"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Converting...");

    while !task.is_finished() {
        let snapshot = status.snapshot().await;
        pb.set_position((snapshot.progress() * 100.0).round() as u64);
        sleep(TICK).await;
    }

    let result = task.wait().await;
    pb.finish_and_clear();
    result
}

/// `mm:ss`, with minutes growing past 59 for long recordings.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_millis(65_900)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "62:05");
    }
}
