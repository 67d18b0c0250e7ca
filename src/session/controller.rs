use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc, oneshot, watch, Mutex,
    },
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    assets::AssetStore,
    audio::{AudioOutput, FadeRamp, InterruptionSignal, OutputHandle, FADE_STEP},
    display::{DisplayControl, Tint},
};

use super::{
    events::EventBus,
    rotation::Rotation,
    state::{Clock, Countdown, TickOutcome},
    FinishReason, SessionConfig, SessionError, SessionEvent, SessionState,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const COMMAND_CAPACITY: usize = 32;

enum Command {
    Start {
        config: SessionConfig,
        reply: oneshot::Sender<Result<String, SessionError>>,
    },
    Cancel {
        reply: oneshot::Sender<bool>,
    },
    Extend {
        extra: Duration,
        reply: oneshot::Sender<Result<u64, SessionError>>,
    },
}

/// Handle to the session engine.
///
/// All state lives in one actor task; this handle only sends it requests, so
/// clones can be shared freely. Interruption signals, timer ticks and fade
/// steps are processed on that same task, one at a time.
#[derive(Clone)]
pub struct SessionEngine {
    commands: mpsc::Sender<Command>,
    events: EventBus,
    state: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
    actor: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionEngine {
    /// Spawns the engine task; must be called from within a tokio runtime.
    pub fn new(
        assets: Arc<dyn AssetStore>,
        audio: Arc<dyn AudioOutput>,
        display: Arc<dyn DisplayControl>,
    ) -> Self {
        let verbose_ticks = std::env::var("SLEEPMATE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let events = EventBus::default();
        let shutdown = CancellationToken::new();

        let actor = EngineActor {
            interruptions: Some(audio.interruptions()),
            assets,
            audio,
            display,
            commands: command_rx,
            events: events.clone(),
            state: state_tx,
            shutdown: shutdown.clone(),
            session: None,
            verbose_ticks,
        };
        let handle = tokio::spawn(actor.run());

        Self {
            commands: command_tx,
            events,
            state: state_rx,
            shutdown,
            actor: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Start a session with the currently selected assets. Returns the new
    /// session id once audio and display are up.
    pub async fn start(&self, config: SessionConfig) -> Result<String, SessionError> {
        self.request(|reply| Command::Start { config, reply }).await?
    }

    /// Stop the active session. Audio and display are released by the time
    /// this returns. `false` when nothing was running.
    pub async fn cancel(&self) -> bool {
        self.request(|reply| Command::Cancel { reply })
            .await
            .unwrap_or(false)
    }

    /// Add time to a playing, timed session. Returns the new remaining
    /// seconds.
    pub async fn extend(&self, extra: Duration) -> Result<u64, SessionError> {
        self.request(|reply| Command::Extend { extra, reply }).await?
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Stop the engine task. An active session finishes as interrupted.
    /// Requests made afterwards fail with [`SessionError::EngineStopped`].
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.actor.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                log_error!("Session engine task failed: {err}");
            }
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::EngineStopped)?;
        reply_rx.await.map_err(|_| SessionError::EngineStopped)
    }
}

struct Fade {
    ramp: FadeRamp,
    step: Clock,
}

struct ActiveSession {
    id: String,
    started: Instant,
    config: SessionConfig,
    output: Option<OutputHandle>,
    countdown: Option<Countdown>,
    fade: Option<Fade>,
    rotation: Option<Rotation>,
    interrupted: bool,
}

impl ActiveSession {
    fn state(&self) -> SessionState {
        if self.interrupted {
            SessionState::Interrupted
        } else if self.fade.is_some() {
            SessionState::FadingOut
        } else {
            SessionState::Playing
        }
    }

    /// Volume the audio should be at right now.
    fn volume(&self, now: Instant) -> f32 {
        match (&self.fade, &self.countdown) {
            (Some(fade), Some(countdown)) => fade.ramp.volume_at(countdown.precise_remaining(now)),
            _ => self.config.nature_volume,
        }
    }
}

struct EngineActor {
    assets: Arc<dyn AssetStore>,
    audio: Arc<dyn AudioOutput>,
    display: Arc<dyn DisplayControl>,
    commands: mpsc::Receiver<Command>,
    interruptions: Option<broadcast::Receiver<InterruptionSignal>>,
    events: EventBus,
    state: watch::Sender<SessionState>,
    shutdown: CancellationToken,
    session: Option<ActiveSession>,
    verbose_ticks: bool,
}

impl EngineActor {
    async fn run(mut self) {
        loop {
            let (tick_at, fade_at, rotate_at) = match &self.session {
                Some(s) => (
                    s.countdown.as_ref().and_then(Countdown::next_tick),
                    s.fade.as_ref().and_then(|f| f.step.deadline()),
                    s.rotation.as_ref().and_then(Rotation::deadline),
                ),
                None => (None, None, None),
            };

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                signal = next_signal(&mut self.interruptions) => self.on_interruption(signal),
                _ = wait_until(tick_at) => self.on_tick(),
                _ = wait_until(fade_at) => self.on_fade_step(),
                _ = wait_until(rotate_at) => self.on_rotate(),
            }
        }

        self.finish(FinishReason::Interrupted);
        log_info!("Session engine stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start { config, reply } => {
                let _ = reply.send(self.start(config));
            }
            Command::Cancel { reply } => {
                let _ = reply.send(self.cancel());
            }
            Command::Extend { extra, reply } => {
                let _ = reply.send(self.extend(extra));
            }
        }
    }

    fn start(&mut self, config: SessionConfig) -> Result<String, SessionError> {
        if self.session.is_some() {
            return Err(SessionError::SessionAlreadyActive);
        }
        config.validate()?;

        let sounds = self.assets.selected_sounds();
        let backgrounds = self.assets.selected_backgrounds();
        if sounds.is_empty() && backgrounds.is_empty() {
            return Err(SessionError::NoAssetSelected);
        }

        let output = if sounds.is_empty() {
            None
        } else {
            match self.audio.load(&sounds, config.nature_volume) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    log_error!("Audio unavailable, session not started: {err}");
                    return Err(err.into());
                }
            }
        };

        let background = backgrounds.first().cloned();
        let tint = Tint::for_background(background.as_ref(), config.brightness);
        if let Err(err) = self.display.activate(background.as_ref(), tint) {
            log_warn!("Display control failed, continuing without nightlight: {err}");
        }

        let now = Instant::now();
        let countdown = config
            .duration
            .as_secs()
            .map(|total| Countdown::start(total, config.effective_fade_secs(), now));
        let starts_in_fade = countdown.as_ref().is_some_and(Countdown::in_fade);
        let rotation = config
            .rotation
            .and_then(|rotation| Rotation::new(backgrounds, rotation, now));

        let id = Uuid::new_v4().to_string();
        log_info!(
            "Session {id} started: timer={}, sounds={}, background={}",
            config
                .duration
                .as_secs()
                .map(|s| format!("{s}s"))
                .unwrap_or_else(|| "off".into()),
            sounds.len(),
            background.as_ref().map(|b| b.id.as_str()).unwrap_or("none"),
        );

        self.session = Some(ActiveSession {
            id: id.clone(),
            started: now,
            config: config.clone(),
            output,
            countdown,
            fade: None,
            rotation,
            interrupted: false,
        });
        self.publish_state();
        self.events.publish(SessionEvent::Started {
            session_id: id.clone(),
            duration_secs: config.duration.as_secs(),
            sound_count: sounds.len(),
            background_id: background.map(|b| b.id),
        });

        if starts_in_fade {
            self.begin_fade(now);
        }
        Ok(id)
    }

    fn cancel(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.finish(FinishReason::UserCancelled);
        true
    }

    fn extend(&mut self, extra: Duration) -> Result<u64, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotExtendable)?;
        if session.state() != SessionState::Playing {
            return Err(SessionError::NotExtendable);
        }
        let countdown = session
            .countdown
            .as_mut()
            .ok_or(SessionError::NotExtendable)?;
        if extra.as_secs() == 0 {
            return Err(SessionError::InvalidConfig(
                "extension must be at least one second".into(),
            ));
        }

        let remaining = countdown.extend(extra.as_secs());
        log_info!(
            "Session {} extended by {}s, {remaining}s remaining",
            session.id,
            extra.as_secs()
        );
        Ok(remaining)
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(countdown) = session.countdown.as_mut() else {
            return;
        };

        let outcome = countdown.tick();
        let remaining = countdown.remaining_secs();
        let output = session.output;
        if self.verbose_ticks {
            log_info!("Session {}: {remaining}s remaining", session.id);
        }
        self.events.publish(SessionEvent::Tick {
            seconds_remaining: remaining,
        });

        match outcome {
            TickOutcome::Continue => {}
            TickOutcome::FadeBegins => self.begin_fade(now),
            TickOutcome::Elapsed => {
                if let Some(handle) = output {
                    if let Err(err) = self.audio.set_volume(handle, 0.0) {
                        log_warn!("Failed to silence {handle} at timer end: {err}");
                    }
                }
                self.finish(FinishReason::TimerElapsed);
            }
        }
    }

    fn begin_fade(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(countdown) = session.countdown.as_ref() else {
            return;
        };

        session.fade = Some(Fade {
            ramp: FadeRamp::new(session.config.nature_volume, countdown.fade_window()),
            step: Clock::starting(now, FADE_STEP),
        });
        log_info!(
            "Session {}: fade-out began with {}s remaining",
            session.id,
            countdown.remaining_secs()
        );
        self.publish_state();
        self.events.publish(SessionEvent::FadeOutBegan);
    }

    fn on_fade_step(&mut self) {
        let now = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(fade) = session.fade.as_mut() else {
            return;
        };

        fade.step.advance(FADE_STEP);
        let volume = session.volume(now);
        if let Some(handle) = session.output {
            if let Err(err) = self.audio.set_volume(handle, volume) {
                log_warn!("Fade step failed on {handle}: {err}");
            }
        }
    }

    fn on_rotate(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(rotation) = session.rotation.as_mut() else {
            return;
        };

        let background = rotation.advance().clone();
        log_debug!("Session {}: rotating to background {}", session.id, background.id);
        let tint = Tint::for_background(Some(&background), session.config.brightness);
        if let Err(err) = self.display.activate(Some(&background), tint) {
            log_warn!("Display control failed during background rotation: {err}");
        }
    }

    fn on_interruption(&mut self, signal: InterruptionSignal) {
        let now = Instant::now();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match signal {
            InterruptionSignal::Began => {
                if session.interrupted {
                    return;
                }
                session.interrupted = true;
                if let Some(countdown) = session.countdown.as_mut() {
                    countdown.pause(now);
                }
                if let Some(fade) = session.fade.as_mut() {
                    fade.step.pause(now);
                }
                if let Some(rotation) = session.rotation.as_mut() {
                    rotation.pause(now);
                }
                if let Some(handle) = session.output {
                    if let Err(err) = self.audio.pause(handle) {
                        log_warn!("Failed to pause {handle} on interruption: {err}");
                    }
                }
                let remaining = session
                    .countdown
                    .as_ref()
                    .map(|c| format!("{}s", c.remaining_secs()))
                    .unwrap_or_else(|| "no timer".into());
                match (&session.fade, &session.countdown) {
                    (Some(fade), Some(countdown)) => log_info!(
                        "Session {} interrupted with {remaining} remaining, fade {:.0}% done",
                        session.id,
                        fade.ramp.progress_at(countdown.precise_remaining(now)) * 100.0
                    ),
                    _ => log_info!("Session {} interrupted with {remaining} remaining", session.id),
                }
                self.publish_state();
            }
            InterruptionSignal::Ended { resumable: false } => {
                if !session.interrupted {
                    return;
                }
                log_info!("Session {} interruption ended without resume", session.id);
                self.finish(FinishReason::Interrupted);
            }
            InterruptionSignal::Ended { resumable: true } => {
                if !session.interrupted {
                    return;
                }
                session.interrupted = false;
                if let Some(countdown) = session.countdown.as_mut() {
                    countdown.resume(now);
                }
                if let Some(fade) = session.fade.as_mut() {
                    fade.step.resume(now);
                }
                if let Some(rotation) = session.rotation.as_mut() {
                    rotation.resume(now);
                }

                let volume = session.volume(now);
                if let Some(handle) = session.output {
                    if let Err(err) = self.audio.resume(handle, volume) {
                        log_error!("Failed to resume {handle} after interruption: {err}");
                        self.finish(FinishReason::Interrupted);
                        return;
                    }
                }
                log_info!("Session {} resumed at volume {volume:.2}", session.id);
                self.publish_state();
            }
        }
    }

    /// Release audio and display exactly once and land in `Finished`. Release
    /// failures are logged; the session ends regardless.
    fn finish(&mut self, reason: FinishReason) {
        let Some(session) = self.session.take() else {
            return;
        };

        if let Some(handle) = session.output {
            if let Err(err) = self.audio.stop(handle) {
                log_error!("Session {}: failed to stop {handle}: {err}", session.id);
            }
        }
        if let Err(err) = self.display.restore() {
            log_error!("Session {}: failed to restore display: {err}", session.id);
        }

        self.state.send_replace(SessionState::Finished);
        log_info!("Session {} finished: {reason:?}", session.id);
        self.events.publish(SessionEvent::Finished {
            session_id: session.id,
            reason,
            elapsed_secs: session.started.elapsed().as_secs(),
        });
    }

    fn publish_state(&self) {
        if let Some(session) = &self.session {
            self.state.send_replace(session.state());
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn next_signal(
    receiver: &mut Option<broadcast::Receiver<InterruptionSignal>>,
) -> InterruptionSignal {
    loop {
        let Some(rx) = receiver.as_mut() else {
            return std::future::pending().await;
        };
        match rx.recv().await {
            Ok(signal) => return signal,
            Err(RecvError::Lagged(skipped)) => {
                log_warn!("Dropped {skipped} interruption signals");
            }
            Err(RecvError::Closed) => {
                log_warn!("Audio output closed its interruption channel");
                *receiver = None;
            }
        }
    }
}
