//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It opens the default input device, downmixes to mono and cuts the stream
//! into fixed-size blocks for the analysis worker. Opening and streaming are
//! separate steps so the worker can be set up for the device's actual rate.
//!
//! ## Features
//! - Automatic audio device selection
//! - f32 configuration closest to the requested sample rate
//! - Mono downmix of multi-channel input
//! - Non-blocking hand-off: blocks are dropped when the worker falls behind

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Sender, TrySendError};
use tracing::{error, info, trace, warn};

use crate::error::{ChordError, Result};

/// The default input device with the stream configuration chosen for it.
pub struct InputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: usize,
}

impl InputDevice {
    /// Sample rate the stream will run at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Opens the default input device and picks an f32 configuration as close
/// to `target_rate` as the device allows.
///
/// # Arguments
/// * `target_rate` - Preferred sample rate in Hz
///
/// # Returns
/// * `Ok(input)` - Device and configuration; `input.sample_rate()` is the rate actually used
/// * `Err(ChordError::Audio)` - No input device, or no f32 format
pub fn open_default_input(target_rate: u32) -> Result<InputDevice> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| ChordError::Audio("No input device available".into()))?;

    info!(
        "Using audio input device: {}",
        device.name().unwrap_or_else(|_| "<unnamed>".into())
    );

    let configs = device
        .supported_input_configs()
        .map_err(|e| ChordError::Audio(e.to_string()))?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| ChordError::Audio("No suitable f32 input format found".into()))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    info!("Selected sample rate: {} Hz, channels: {}", sample_rate, channels);

    Ok(InputDevice {
        device,
        config: config.into(),
        sample_rate,
        channels,
    })
}

/// Starts streaming from `input`.
///
/// Every `block_size` mono samples are sent as one block on `sender` with
/// `try_send`; blocks are dropped while the queue is full.
///
/// # Arguments
/// * `input` - Device opened with [`open_default_input`]
/// * `sender` - Channel sender feeding the analysis worker
/// * `block_size` - Samples per block, normally the transform size
///
/// # Returns
/// * `Ok(stream)` - Playing stream; capture stops when it is dropped
/// * `Err(e)` - Zero block size, or the stream could not be built or started
pub fn start_audio_capture(
    input: InputDevice,
    sender: Sender<Vec<f32>>,
    block_size: usize,
) -> Result<cpal::Stream> {
    if block_size == 0 {
        return Err(ChordError::InvalidTransformSize(block_size));
    }

    let channels = input.channels;
    let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

    // This buffer will accumulate mono audio data from the callback.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(block_size * 2);
    let mut dropped_blocks: u64 = 0;

    let stream = input
        .device
        .build_input_stream(
            &input.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                downmix_into(data, channels, &mut audio_buffer);

                while audio_buffer.len() >= block_size {
                    let block = audio_buffer[..block_size].to_vec();
                    match sender.try_send(block) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            dropped_blocks += 1;
                            if dropped_blocks % 100 == 1 {
                                warn!("Analysis queue full, dropped {} blocks", dropped_blocks);
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            trace!("Analysis queue closed, discarding audio");
                        }
                    }
                    audio_buffer.drain(..block_size);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| ChordError::Audio(e.to_string()))?;

    stream
        .play()
        .map_err(|e| ChordError::Audio(e.to_string()))?;

    info!("Audio capture started: block size {}", block_size);
    Ok(stream)
}

/// Appends the mono average of interleaved `data` to `out`.
fn downmix_into(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        data.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats are considered. Mono is preferred over
/// multi-channel, then the range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_rate = c.min_sample_rate().0;
            let max_rate = c.max_sample_rate().0;
            let rate_diff = if (min_rate..=max_rate).contains(&target_rate) {
                0
            } else {
                min_rate.abs_diff(target_rate).min(max_rate.abs_diff(target_rate))
            };
            (c.channels() != 1, rate_diff)
        })
}
