//! Deferred events on the session clock.

use crate::model::Color;

/// Transient display state cleared by a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clear {
    LevelAnnouncement,
    LifeBanner,
    WarpBanner,
    IntroMessage,
    Countdown,
    Flash,
    Pulse,
    Text(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// End of the warp slowdown, the rows start scrolling back.
    WarpReverse,
    /// Level banner done, start the lane countdown.
    BeginExpansion { level: u32 },
    ExpansionTick,
    TutorialTick,
    /// One frame of the alias spin; stage 2 commits the rule.
    AliasSpin { stage: u8, from: Color },
    Clear(Clear),
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    due: f64,
    seq: u64,
    event: TimerEvent,
}

/// Pending events ordered by due time, then by scheduling order.
#[derive(Debug, Default)]
pub struct Timers {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Timers {
    pub fn schedule(&mut self, due: f64, event: TimerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { due, seq, event });
    }

    /// Removes and returns the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<TimerEvent> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(idx).event)
    }

    /// Drops pending clears of one kind, so a re-shown banner gets its full time.
    pub fn cancel(&mut self, event: TimerEvent) {
        self.entries.retain(|e| e.event != event);
    }

    pub fn cancel_where(&mut self, pred: impl Fn(&TimerEvent) -> bool) {
        self.entries.retain(|e| !pred(&e.event));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_then_insertion_order() {
        let mut t = Timers::default();
        t.schedule(300.0, TimerEvent::ExpansionTick);
        t.schedule(100.0, TimerEvent::Clear(Clear::Flash));
        t.schedule(100.0, TimerEvent::Clear(Clear::Pulse));
        assert_eq!(t.pop_due(50.0), None);
        assert_eq!(t.pop_due(400.0), Some(TimerEvent::Clear(Clear::Flash)));
        assert_eq!(t.pop_due(400.0), Some(TimerEvent::Clear(Clear::Pulse)));
        assert_eq!(t.pop_due(400.0), Some(TimerEvent::ExpansionTick));
        assert!(t.is_empty());
    }

    #[test]
    fn cancel_removes_matching_entries() {
        let mut t = Timers::default();
        t.schedule(10.0, TimerEvent::Clear(Clear::LifeBanner));
        t.schedule(20.0, TimerEvent::Clear(Clear::Text(4)));
        t.cancel(TimerEvent::Clear(Clear::LifeBanner));
        t.cancel_where(|e| matches!(e, TimerEvent::Clear(Clear::Text(_))));
        assert_eq!(t.len(), 0);
    }
}
