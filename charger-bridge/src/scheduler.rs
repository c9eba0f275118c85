//! Deferred "next available channel" command scheduling.
//!
//! At most one command can wait for a battery to be plugged in. A newer
//! command replaces the pending one; the first channel to report a
//! connect edge while the command is still live takes it. An expired
//! command is dropped silently at the first consumption attempt.

use crate::controller::ChargeMode;
use std::time::{Duration, Instant};

pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    pub mode: ChargeMode,
    pub cell_count: u8,
    pub current_ma: u32,
    expires_at: Instant,
}

pub struct CommandScheduler {
    pending: Option<PendingCommand>,
    ttl: Duration,
}

impl CommandScheduler {
    pub fn new(ttl: Duration) -> Self {
        Self { pending: None, ttl }
    }

    /// Stores a deferred command, replacing any existing one.
    pub fn schedule(&mut self, mode: ChargeMode, cell_count: u8, current_ma: u32, now: Instant) {
        self.pending = Some(PendingCommand {
            mode,
            cell_count,
            current_ma,
            expires_at: now + self.ttl,
        });
    }

    /// Consumes the pending command if one is live. Expired commands are
    /// cleared without being returned. Either way the slot is empty
    /// afterwards - only one consumer ever wins.
    pub fn take_pending(&mut self, now: Instant) -> Option<PendingCommand> {
        let cmd = self.pending.take()?;
        if now >= cmd.expires_at {
            return None;
        }
        Some(cmd)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumed_before_expiry_applies() {
        let t0 = Instant::now();
        let mut s = CommandScheduler::new(DEFAULT_PENDING_TTL);
        s.schedule(ChargeMode::Charge, 4, 2000, t0);
        let cmd = s.take_pending(t0 + Duration::from_secs(30)).unwrap();
        assert_eq!(cmd.mode, ChargeMode::Charge);
        assert_eq!(cmd.cell_count, 4);
        assert_eq!(cmd.current_ma, 2000);
        assert!(!s.has_pending());
    }

    #[test]
    fn expired_command_is_discarded_silently() {
        let t0 = Instant::now();
        let mut s = CommandScheduler::new(DEFAULT_PENDING_TTL);
        s.schedule(ChargeMode::Storage, 3, 1000, t0);
        assert!(s.take_pending(t0 + Duration::from_secs(60)).is_none());
        assert!(!s.has_pending());
    }

    #[test]
    fn first_consumer_wins() {
        let t0 = Instant::now();
        let mut s = CommandScheduler::new(DEFAULT_PENDING_TTL);
        s.schedule(ChargeMode::Charge, 2, 500, t0);
        assert!(s.take_pending(t0).is_some());
        assert!(s.take_pending(t0).is_none());
    }

    #[test]
    fn newer_schedule_overwrites_pending() {
        let t0 = Instant::now();
        let mut s = CommandScheduler::new(DEFAULT_PENDING_TTL);
        s.schedule(ChargeMode::Charge, 2, 500, t0);
        s.schedule(ChargeMode::Storage, 6, 3000, t0);
        let cmd = s.take_pending(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(cmd.mode, ChargeMode::Storage);
        assert_eq!(cmd.cell_count, 6);
    }

    #[test]
    fn empty_scheduler_is_a_noop() {
        let mut s = CommandScheduler::new(DEFAULT_PENDING_TTL);
        assert!(s.take_pending(Instant::now()).is_none());
    }
}
