use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::broadcast;

use crate::db::models::SoundAsset;

use super::{
    synth::{Ambience, AmbienceSource},
    wait_for_device, AudioError, AudioOutput, InterruptionSignal, OutputHandle,
    INTERRUPTION_CAPACITY,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// How long `load` waits for the audio thread to open the device.
const LOAD_TIMEOUT: Duration = Duration::from_secs(3);
/// How long `stop` waits for the sinks to be torn down.
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

enum AudioCommand {
    Load {
        handle: OutputHandle,
        sounds: Vec<SoundAsset>,
        volume: f32,
        reply: Sender<Result<(), AudioError>>,
    },
    SetVolume(OutputHandle, f32),
    Pause(OutputHandle),
    Resume(OutputHandle, f32),
    Stop {
        handle: OutputHandle,
        done: Option<Sender<()>>,
    },
}

/// Device state owned by the audio thread. rodio's stream is not `Send`, so
/// it never leaves that thread.
struct Device {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    sinks: HashMap<OutputHandle, Vec<Sink>>,
    sound_dir: PathBuf,
}

impl Device {
    fn stream_handle(&mut self) -> Result<&OutputStreamHandle, AudioError> {
        if self.stream.is_none() {
            let opened = OutputStream::try_default().map_err(|e| {
                AudioError::Unavailable(format!("failed to open audio output stream: {e}"))
            })?;
            self.stream = Some(opened);
        }
        match &self.stream {
            Some((_, handle)) => Ok(handle),
            None => Err(AudioError::Unavailable("audio output stream missing".into())),
        }
    }

    fn load(&mut self, handle: OutputHandle, sounds: &[SoundAsset], volume: f32) -> Result<(), AudioError> {
        let mut sinks = Vec::with_capacity(sounds.len());
        for sound in sounds {
            let stream_handle = self.stream_handle()?;
            let sink = Sink::try_new(stream_handle)
                .map_err(|e| AudioError::Unavailable(format!("failed to create audio sink: {e}")))?;
            sink.set_volume(volume.clamp(0.0, 1.0));
            self.append_loop(&sink, sound)?;
            sinks.push(sink);
        }
        self.sinks.insert(handle, sinks);
        Ok(())
    }

    fn append_loop(&self, sink: &Sink, sound: &SoundAsset) -> Result<(), AudioError> {
        if let Some(kind) = Ambience::from_locator(&sound.source) {
            let kind = kind.map_err(AudioError::Device)?;
            sink.append(AmbienceSource::new(kind));
            return Ok(());
        }

        let path = resolve(&self.sound_dir, &sound.source);
        let file = File::open(&path)
            .map_err(|e| AudioError::Device(format!("cannot open {}: {e}", path.display())))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| AudioError::Device(format!("cannot decode {}: {e}", path.display())))?;
        sink.append(decoder.repeat_infinite());
        Ok(())
    }

    fn each_sink(&self, handle: OutputHandle, f: impl Fn(&Sink)) {
        if let Some(sinks) = self.sinks.get(&handle) {
            sinks.iter().for_each(f);
        }
    }

    fn stop(&mut self, handle: OutputHandle) {
        if let Some(sinks) = self.sinks.remove(&handle) {
            for sink in sinks {
                sink.stop();
            }
        }
        // Release the device once nothing plays on it.
        if self.sinks.is_empty() {
            self.stream = None;
        }
    }
}

fn resolve(sound_dir: &Path, locator: &str) -> PathBuf {
    let path = Path::new(locator);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        sound_dir.join(path)
    }
}

/// rodio-backed output: one sink per sound, all mixed on the default device.
pub struct RodioOutput {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    next_handle: AtomicU64,
    sound_dir: PathBuf,
    interruptions: broadcast::Sender<InterruptionSignal>,
}

impl RodioOutput {
    /// Relative file locators resolve against `sound_dir`.
    pub fn new(sound_dir: PathBuf) -> Self {
        let (interruptions, _) = broadcast::channel(INTERRUPTION_CAPACITY);
        Self {
            tx: Arc::new(Mutex::new(None)),
            next_handle: AtomicU64::new(1),
            sound_dir,
            interruptions,
        }
    }

    /// Platform glue reports preemption here; the engine picks it up from
    /// [`AudioOutput::interruptions`].
    pub fn notify_interruption(&self, signal: InterruptionSignal) {
        let _ = self.interruptions.send(signal);
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, AudioError> {
        let mut guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let sound_dir = self.sound_dir.clone();

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let mut device = Device {
                    stream: None,
                    sinks: HashMap::new(),
                    sound_dir,
                };

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Load {
                            handle,
                            sounds,
                            volume,
                            reply,
                        } => {
                            let result = device.load(handle, &sounds, volume);
                            if let Err(err) = &result {
                                log_error!("{handle}: load failed: {err}");
                                device.stop(handle);
                            }
                            let _ = reply.send(result);
                        }
                        AudioCommand::SetVolume(handle, v) => {
                            device.each_sink(handle, |s| s.set_volume(v.clamp(0.0, 1.0)));
                        }
                        AudioCommand::Pause(handle) => device.each_sink(handle, |s| s.pause()),
                        AudioCommand::Resume(handle, v) => device.each_sink(handle, |s| {
                            s.set_volume(v.clamp(0.0, 1.0));
                            s.play();
                        }),
                        AudioCommand::Stop { handle, done } => {
                            device.stop(handle);
                            if let Some(done) = done {
                                let _ = done.send(());
                            }
                        }
                    }
                }

                log_info!("audio output thread exiting");
            })
            .map_err(|e| AudioError::Unavailable(format!("failed to spawn audio thread: {e}")))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, cmd: AudioCommand) -> Result<(), AudioError> {
        let tx = self.ensure_thread()?;
        tx.send(cmd)
            .map_err(|e| AudioError::Device(format!("audio thread gone: {e}")))
    }
}

impl AudioOutput for RodioOutput {
    fn load(&self, sounds: &[SoundAsset], volume: f32) -> Result<OutputHandle, AudioError> {
        let handle = OutputHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        for sound in sounds.iter().filter(|s| s.source_alt.is_some()) {
            log_warn!("{}: alternate loop source ignored, looping primary", sound.id);
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(AudioCommand::Load {
            handle,
            sounds: sounds.to_vec(),
            volume,
            reply: reply_tx,
        })?;

        match wait_for_device(&reply_rx, LOAD_TIMEOUT) {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                let _ = self.send(AudioCommand::Stop { handle, done: None });
                Err(AudioError::Unavailable("audio device did not respond".into()))
            }
        }
    }

    fn set_volume(&self, handle: OutputHandle, level: f32) -> Result<(), AudioError> {
        self.send(AudioCommand::SetVolume(handle, level))
    }

    fn pause(&self, handle: OutputHandle) -> Result<(), AudioError> {
        self.send(AudioCommand::Pause(handle))
    }

    fn resume(&self, handle: OutputHandle, volume: f32) -> Result<(), AudioError> {
        self.send(AudioCommand::Resume(handle, volume))
    }

    /// Returns once the audio thread has released the sinks.
    fn stop(&self, handle: OutputHandle) -> Result<(), AudioError> {
        let tx = {
            let guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                // No thread, nothing was ever loaded.
                None => return Ok(()),
            }
        };

        let (done_tx, done_rx) = mpsc::channel();
        if tx
            .send(AudioCommand::Stop {
                handle,
                done: Some(done_tx),
            })
            .is_err()
        {
            log_warn!("{handle}: audio thread already gone at stop");
            return Ok(());
        }
        wait_for_device(&done_rx, STOP_TIMEOUT).map_err(|_| {
            AudioError::Device(format!("{handle}: audio thread did not confirm stop"))
        })
    }

    fn interruptions(&self) -> broadcast::Receiver<InterruptionSignal> {
        self.interruptions.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_a_thread_is_a_no_op() {
        let output = RodioOutput::new(PathBuf::from("."));
        assert!(output.stop(OutputHandle(1)).is_ok());
        assert!(output.tx.lock().unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn stop_waits_for_the_audio_thread() {
        let output = RodioOutput::new(PathBuf::from("."));
        // Volume changes spawn the thread without opening the device.
        output.set_volume(OutputHandle(1), 0.5).unwrap();

        assert!(output.stop(OutputHandle(1)).is_ok());
        assert!(output.stop(OutputHandle(1)).is_ok());
    }
}
