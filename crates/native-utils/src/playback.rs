use crate::audio::{resample, shared_buffer};
use crate::device::get_or_default_output;
use anyhow::{Context, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use std::sync::mpsc;
use std::time::Duration;

/// Extra time allowed on top of the clip length before playback is
/// considered stuck.
const PLAYBACK_GRACE: Duration = Duration::from_secs(5);
/// Lets the device drain its last hardware buffer before the stream drops.
const PLAYBACK_TAIL: Duration = Duration::from_millis(150);

/// Plays mono `samples` recorded at `sample_rate` and returns once they
/// have been handed to the device.
///
/// Blocks the calling thread; call from `spawn_blocking` in async code.
pub fn play_blocking(samples: &[f32], sample_rate: f64, device_name: Option<&str>) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let output = get_or_default_output(device_name)?;
    let output_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: output_config.channels(),
        sample_rate: output_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    let channels = output_config.channels as usize;
    let output_rate = output_config.sample_rate.0 as f64;

    let samples = resample(samples, sample_rate, output_rate)?;
    let clip_length = Duration::from_secs_f64(samples.len() as f64 / output_rate);

    let (mut producer, mut consumer) = shared_buffer(samples.len()).split();
    let pushed = producer.push_slice(&samples);
    if pushed < samples.len() {
        tracing::warn!("Dropped {} samples that did not fit the buffer", samples.len() - pushed);
    }

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let mut done_tx = Some(done_tx);
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut exhausted = false;
        for frame in data.chunks_mut(channels) {
            let sample = consumer.try_pop().unwrap_or_else(|| {
                exhausted = true;
                0.0
            });
            frame.fill(sample);
        }
        if exhausted {
            if let Some(tx) = done_tx.take() {
                let _ = tx.send(());
            }
        }
    };

    let stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;

    done_rx
        .recv_timeout(clip_length + PLAYBACK_GRACE)
        .context("Playback did not finish in time")?;
    std::thread::sleep(PLAYBACK_TAIL);
    drop(stream);
    Ok(())
}
