//! Trace scrubber with a cooperative play timer
//!
//! The player knows nothing about rendering. It holds a cursor over `total`
//! steps, and while playing, [`TracePlayer::tick`] advances the cursor at
//! most once per interval. Pausing clears the pending tick immediately, so a
//! tick that arrives after [`TracePlayer::pause`] never moves the cursor.

use std::time::{Duration, Instant};

/// Default delay between steps while playing
pub const PLAY_INTERVAL: Duration = Duration::from_millis(600);

#[derive(Debug, Clone)]
pub struct TracePlayer {
    total: usize,
    current: usize,
    interval: Duration,
    /// Set only while playing
    next_tick: Option<Instant>,
}

impl TracePlayer {
    pub fn new(total: usize) -> Self {
        Self::with_interval(total, PLAY_INTERVAL)
    }

    pub fn with_interval(total: usize, interval: Duration) -> Self {
        TracePlayer {
            total,
            current: 0,
            interval,
            next_tick: None,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn at_start(&self) -> bool {
        self.current == 0
    }

    pub fn at_end(&self) -> bool {
        self.current + 1 >= self.total
    }

    fn last(&self) -> usize {
        self.total.saturating_sub(1)
    }

    /// Move to `index`, clamped to the trace
    pub fn seek(&mut self, index: usize) {
        self.current = index.min(self.last());
    }

    /// Returns false at the end
    pub fn step_forward(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Returns false at the start
    pub fn step_backward(&mut self) -> bool {
        if self.at_start() {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn jump_start(&mut self) {
        self.current = 0;
    }

    pub fn jump_end(&mut self) {
        self.current = self.last();
    }

    /// Start or stop playback. Playing from the end restarts at the first step.
    pub fn toggle_play(&mut self, now: Instant) {
        if self.is_playing() {
            self.pause();
            return;
        }
        if self.total == 0 {
            return;
        }
        if self.at_end() {
            self.jump_start();
        }
        self.next_tick = Some(now + self.interval);
    }

    pub fn pause(&mut self) {
        self.next_tick = None;
    }

    /// Advance if a tick is due; returns whether the cursor moved
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_tick else {
            return false;
        };
        if now < due {
            return false;
        }
        let moved = self.step_forward();
        if self.at_end() {
            self.pause();
        } else {
            self.next_tick = Some(now + self.interval);
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_seek_is_clamped() {
        let mut player = TracePlayer::new(5);
        player.seek(3);
        assert_eq!(player.current(), 3);
        player.seek(99);
        assert_eq!(player.current(), 4);

        let mut empty = TracePlayer::new(0);
        empty.seek(2);
        assert_eq!(empty.current(), 0);
        assert!(!empty.step_forward());
    }

    #[test]
    fn test_stepping_stops_at_bounds() {
        let mut player = TracePlayer::new(2);
        assert!(!player.step_backward());
        assert!(player.step_forward());
        assert!(!player.step_forward());
        player.jump_start();
        assert!(player.at_start());
        player.jump_end();
        assert_eq!(player.current(), 1);
    }

    #[test]
    fn test_tick_advances_once_per_interval() {
        let start = Instant::now();
        let mut player = TracePlayer::with_interval(10, 100 * MS);
        player.toggle_play(start);
        assert!(!player.tick(start + 50 * MS));
        assert!(player.tick(start + 100 * MS));
        assert_eq!(player.current(), 1);
        // The next tick is scheduled from the last advance.
        assert!(!player.tick(start + 150 * MS));
        assert!(player.tick(start + 200 * MS));
        assert_eq!(player.current(), 2);
    }

    #[test]
    fn test_pause_takes_effect_before_next_tick() {
        let start = Instant::now();
        let mut player = TracePlayer::with_interval(10, 100 * MS);
        player.toggle_play(start);
        player.pause();
        assert!(!player.tick(start + 500 * MS));
        assert_eq!(player.current(), 0);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_playback_stops_at_end_and_restarts() {
        let start = Instant::now();
        let mut player = TracePlayer::with_interval(3, 10 * MS);
        player.toggle_play(start);
        assert!(player.tick(start + 10 * MS));
        assert!(player.tick(start + 20 * MS));
        assert!(player.at_end());
        assert!(!player.is_playing());

        player.toggle_play(start + 30 * MS);
        assert!(player.at_start());
        assert!(player.is_playing());
    }

    #[test]
    fn test_empty_trace_never_plays() {
        let mut player = TracePlayer::new(0);
        player.toggle_play(Instant::now());
        assert!(!player.is_playing());
    }
}
