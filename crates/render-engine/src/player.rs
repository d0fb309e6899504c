//! Autoplay driver.
//!
//! Owns a [`Transport`] in a spawned task, advances it on the autoplay clock
//! and publishes session time for render loops to follow.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

use reframe_playback_core::{Transport, TransportState};

#[derive(Debug, Clone, Copy)]
enum PlayerCommand {
    Load { keyframes: usize, duration: f64 },
    Play,
    Pause,
    Toggle,
    Scrub(f64),
}

/// Handle to a running autoplay task.
pub struct Player {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    time: watch::Receiver<f64>,
    state: watch::Receiver<TransportState>,
    stop: Option<DropGuard>,
    task: Option<JoinHandle<Transport>>,
}

impl Player {
    /// Spawn a player around `transport` on the current tokio runtime.
    pub fn spawn(transport: Transport) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (time_tx, time) = watch::channel(transport.current_time());
        let (state_tx, state) = watch::channel(transport.state());
        let stop_token = CancellationToken::new();
        let task = tokio::spawn(run(
            transport,
            rx,
            time_tx,
            state_tx,
            stop_token.child_token(),
        ));

        Self {
            commands,
            time,
            state,
            stop: Some(stop_token.drop_guard()),
            task: Some(task),
        }
    }

    pub fn load(&self, keyframes: usize, duration: f64) {
        self.send(PlayerCommand::Load {
            keyframes,
            duration,
        });
    }

    pub fn play(&self) {
        self.send(PlayerCommand::Play);
    }

    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    pub fn toggle(&self) {
        self.send(PlayerCommand::Toggle);
    }

    pub fn scrub(&self, time: f64) {
        self.send(PlayerCommand::Scrub(time));
    }

    /// Session time feed.
    pub fn time(&self) -> watch::Receiver<f64> {
        self.time.clone()
    }

    /// Transport state feed.
    pub fn state(&self) -> watch::Receiver<TransportState> {
        self.state.clone()
    }

    /// Stop the task and hand back the transport.
    pub async fn stop(mut self) -> Option<Transport> {
        drop(self.stop.take());
        let task = self.task.take()?;
        match task.await {
            Ok(transport) => Some(transport),
            Err(e) => {
                tracing::warn!(error = %e, "Player task join failed");
                None
            }
        }
    }

    fn send(&self, command: PlayerCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!(?command, "Player task is gone, dropping command");
        }
    }
}

async fn run(
    mut transport: Transport,
    mut commands: mpsc::UnboundedReceiver<PlayerCommand>,
    time_tx: watch::Sender<f64>,
    state_tx: watch::Sender<TransportState>,
    stop: CancellationToken,
) -> Transport {
    let mut ticker = tokio::time::interval(transport.clock().interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    PlayerCommand::Load { keyframes, duration } => transport.load(keyframes, duration),
                    PlayerCommand::Play => {
                        transport.play();
                        ticker.reset();
                    }
                    PlayerCommand::Pause => transport.pause(),
                    PlayerCommand::Toggle => {
                        transport.toggle();
                        ticker.reset();
                    }
                    PlayerCommand::Scrub(time) => {
                        transport.scrub(time);
                    }
                }
            }
            _ = ticker.tick(), if transport.is_playing() => {
                transport.tick();
            }
        }

        time_tx.send_if_modified(|time| {
            let changed = time.to_bits() != transport.current_time().to_bits();
            *time = transport.current_time();
            changed
        });
        state_tx.send_if_modified(|state| {
            let changed = *state != transport.state();
            *state = transport.state();
            changed
        });
    }

    tracing::debug!(time_secs = transport.current_time(), "Player stopped");
    transport
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use reframe_common::clock::AutoplayClock;

    fn fast_transport() -> Transport {
        Transport::new(AutoplayClock::new(0.1, Duration::from_millis(2)))
    }

    #[tokio::test]
    async fn test_autoplay_runs_to_end_and_pauses() {
        let player = Player::spawn(fast_transport());
        let mut state = player.state();
        let mut time = player.time();

        player.load(3, 0.5);
        player.play();

        tokio::time::timeout(Duration::from_secs(5), time.wait_for(|t| *t == 0.5))
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == TransportState::Paused),
        )
        .await
        .unwrap()
        .unwrap();

        let transport = player.stop().await.unwrap();
        assert_eq!(transport.current_time(), 0.5);
    }

    #[tokio::test]
    async fn test_scrub_publishes_time() {
        let player = Player::spawn(fast_transport());
        let mut time = player.time();

        player.load(2, 10.0);
        player.scrub(4.0);
        tokio::time::timeout(Duration::from_secs(5), time.wait_for(|t| *t == 4.0))
            .await
            .unwrap()
            .unwrap();

        player.scrub(25.0);
        tokio::time::timeout(Duration::from_secs(5), time.wait_for(|t| *t == 10.0))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*player.state().borrow(), TransportState::Paused);
        player.stop().await;
    }
}
