//! Audio output to system speakers via cpal.
//!
//! A `cpal::Stream` is not `Send` on every host, so the stream lives on a
//! dedicated thread and is driven by commands over a crossbeam channel.
//! The render callback pulls from the attached [`SampleSource`] and writes
//! silence when nothing is attached or the slot is contended.

use super::{AudioOutput, SampleSource};
use crate::config::AudioConfig;
use crate::error::{BreathlineError, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type SourceSlot = Arc<Mutex<Option<Box<dyn SampleSource>>>>;

const COMMAND_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

enum OutputCommand {
    Resume(Sender<Result<()>>),
    Shutdown,
}

/// cpal-backed [`AudioOutput`].
pub struct CpalOutput {
    sample_rate: u32,
    slot: SourceSlot,
    commands: Sender<OutputCommand>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the configured (or default) output device.
    ///
    /// The stream is built suspended; call [`AudioOutput::resume`] to start
    /// rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available or the stream
    /// cannot be built.
    pub fn open(config: &AudioConfig) -> Result<Self> {
        let slot: SourceSlot = Arc::new(Mutex::new(None));
        let (cmd_tx, cmd_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<u32>>(1);

        let device_name = config.output_device.clone();
        let thread_slot = Arc::clone(&slot);
        let thread = std::thread::Builder::new()
            .name("breathline-audio".into())
            .spawn(move || output_thread(device_name, thread_slot, cmd_rx, ready_tx))
            .map_err(|e| BreathlineError::Audio(format!("cannot spawn audio thread: {e}")))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(BreathlineError::Audio(
                    "audio thread exited during setup".into(),
                ));
            }
        };

        Ok(Self {
            sample_rate,
            slot,
            commands: cmd_tx,
            thread: Some(thread),
        })
    }

    /// List available output devices.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| BreathlineError::Audio(format!("cannot enumerate devices: {e}")))?;

        let mut names = Vec::new();
        for device in devices {
            if let Ok(desc) = device.description() {
                names.push(desc.name().to_owned());
            }
        }
        Ok(names)
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn resume(&mut self) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.commands
            .send(OutputCommand::Resume(reply_tx))
            .map_err(|_| BreathlineError::Channel("audio thread is gone".into()))?;
        reply_rx
            .recv_timeout(COMMAND_REPLY_TIMEOUT)
            .map_err(|e| BreathlineError::Channel(format!("no resume reply: {e}")))?
    }

    fn attach(&mut self, source: Box<dyn SampleSource>) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| BreathlineError::Audio(format!("source slot poisoned: {e}")))?;
        *slot = Some(source);
        Ok(())
    }

    fn detach(&mut self) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn is_attached(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.commands.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn open_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|e| BreathlineError::Audio(format!("cannot enumerate devices: {e}")))?
            .find(|d| {
                d.description()
                    .ok()
                    .map(|desc| desc.name() == name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| BreathlineError::Audio(format!("output device '{name}' not found"))),
        None => host
            .default_output_device()
            .ok_or_else(|| BreathlineError::Audio("no default output device".into())),
    }
}

fn build_stream(device_name: Option<&str>, slot: SourceSlot) -> Result<(cpal::Stream, u32)> {
    let device = open_device(device_name)?;
    let label = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());

    let default_config = device
        .default_output_config()
        .map_err(|e| BreathlineError::Audio(format!("no default output config: {e}")))?;
    let sample_rate = default_config.sample_rate();
    let channels = default_config.channels().max(1);

    let stream_config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };
    info!("using output device: {label} ({sample_rate}Hz, {channels} channels)");

    let ch = channels as usize;
    let mut mono: Vec<f32> = Vec::new();
    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let frames = data.len() / ch;
                let Ok(mut guard) = slot.try_lock() else {
                    data.fill(0.0);
                    return;
                };
                let Some(source) = guard.as_mut() else {
                    data.fill(0.0);
                    return;
                };
                if mono.len() < frames {
                    mono.resize(frames, 0.0);
                }
                source.fill(&mut mono[..frames]);
                for (frame, sample) in data.chunks_mut(ch).zip(mono.iter()) {
                    frame.fill(*sample);
                }
                if source.is_finished() {
                    *guard = None;
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| BreathlineError::Audio(format!("failed to build output stream: {e}")))?;

    Ok((stream, sample_rate))
}

fn output_thread(
    device_name: Option<String>,
    slot: SourceSlot,
    commands: Receiver<OutputCommand>,
    ready: Sender<Result<u32>>,
) {
    let stream = match build_stream(device_name.as_deref(), slot) {
        Ok((stream, rate)) => {
            let _ = ready.send(Ok(rate));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut playing = false;
    for command in commands.iter() {
        match command {
            OutputCommand::Resume(reply) => {
                let result = if playing {
                    Ok(())
                } else {
                    stream.play().map_err(|e| {
                        BreathlineError::Audio(format!("failed to start output stream: {e}"))
                    })
                };
                if let Err(ref e) = result {
                    warn!("{e}");
                } else if !playing {
                    debug!("audio output resumed");
                    playing = true;
                }
                let _ = reply.send(result);
            }
            OutputCommand::Shutdown => break,
        }
    }

    drop(stream);
    info!("audio output stopped");
}
