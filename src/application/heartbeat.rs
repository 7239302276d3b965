// Keep-alive loop run for the lifetime of an open connection
use crate::application::command_channel::CommandChannel;
use crate::domain::connection::Command;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

/// Handle to a running heartbeat task
pub struct Heartbeat {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Heartbeat {
    pub fn start(channel: CommandChannel, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(heartbeat_loop(channel, period, cancel.clone()));
        Self { cancel, task }
    }

    /// Request cancellation without waiting for the loop to exit
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the loop and wait until it has exited. An in-flight send is
    /// allowed to finish so the port is never closed underneath it.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Heartbeat task ended abnormally: {}", e);
        }
    }
}

async fn heartbeat_loop(channel: CommandChannel, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match channel.send(Command::Heartbeat).await {
            Ok(()) => tracing::trace!("Heartbeat sent"),
            Err(e) => tracing::warn!("Heartbeat failed: {}", e),
        }
    }

    tracing::debug!("Heartbeat loop exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::MockLink;

    #[tokio::test(start_paused = true)]
    async fn test_sends_once_per_period() {
        let link = MockLink::new();
        let channel = CommandChannel::new(link.clone(), Duration::from_millis(500));
        let heartbeat = Heartbeat::start(channel, HEARTBEAT_PERIOD);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        heartbeat.stop().await;

        assert_eq!(link.count("HEARTBEAT\n"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sends_after_stop() {
        let link = MockLink::new();
        let channel = CommandChannel::new(link.clone(), Duration::from_millis(500));
        let heartbeat = Heartbeat::start(channel, HEARTBEAT_PERIOD);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        heartbeat.stop().await;
        let sent = link.count("HEARTBEAT\n");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(link.count("HEARTBEAT\n"), sent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_loop() {
        let link = MockLink::new();
        link.fail_writes(true);
        let channel = CommandChannel::new(link.clone(), Duration::from_millis(500));
        let heartbeat = Heartbeat::start(channel, HEARTBEAT_PERIOD);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        link.fail_writes(false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        heartbeat.stop().await;

        assert_eq!(link.count("HEARTBEAT\n"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_send() {
        let link = MockLink::new();
        link.set_write_delay(Duration::from_millis(300));
        let channel = CommandChannel::new(link.clone(), Duration::from_millis(500));
        let heartbeat = Heartbeat::start(channel, HEARTBEAT_PERIOD);

        // land inside the first write
        tokio::time::sleep(Duration::from_millis(1100)).await;
        heartbeat.stop().await;

        assert_eq!(link.count("HEARTBEAT\n"), 1);
    }
}
