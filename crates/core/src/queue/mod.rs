use std::{collections::VecDeque, time::Duration};

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandKind};

/// Sequence number assigned to each command on enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCommand {
    pub id: CommandId,
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    /// One command is executing; the rest wait behind it.
    Draining { in_flight: CommandId },
}

/// Record of a command that left the queue by completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCommand {
    pub id: CommandId,
    pub kind: CommandKind,
    pub started_at: Duration,
    pub finished_at: Duration,
    /// The command errored and was completed early.
    pub failed: bool,
}

/// Strict FIFO of pending commands plus the in-flight marker.
///
/// The queue only does bookkeeping. Executing a command and waiting for it
/// to finish is the session's job.
#[derive(Debug)]
pub struct CommandQueue {
    pending: VecDeque<QueuedCommand>,
    state: QueueState,
    in_flight_kind: Option<(CommandKind, Duration)>,
    next_id: u64,
    history: VecDeque<CompletedCommand>,
    history_limit: usize,
}

impl CommandQueue {
    pub fn new(history_limit: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            state: QueueState::Idle,
            in_flight_kind: None,
            next_id: 0,
            history: VecDeque::new(),
            history_limit,
        }
    }

    pub fn push(&mut self, command: Command) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        self.pending.push_back(QueuedCommand { id, command });
        id
    }

    /// Pops the head command and marks it in flight. Returns `None` and goes
    /// idle once nothing is left.
    ///
    /// Must not be called while another command is still in flight.
    pub fn start_next(&mut self, now: Duration) -> Option<QueuedCommand> {
        debug_assert!(self.is_idle(), "a command is already in flight");
        match self.pending.pop_front() {
            Some(next) => {
                self.state = QueueState::Draining { in_flight: next.id };
                self.in_flight_kind = Some((next.command.kind(), now));
                Some(next)
            }
            None => {
                self.state = QueueState::Idle;
                None
            }
        }
    }

    /// Marks the in-flight command finished and records it in the history.
    pub fn finish(&mut self, now: Duration, failed: bool) -> Option<CompletedCommand> {
        let QueueState::Draining { in_flight } = self.state else {
            return None;
        };
        self.state = QueueState::Idle;
        let (kind, started_at) = self.in_flight_kind.take()?;
        let record = CompletedCommand {
            id: in_flight,
            kind,
            started_at,
            finished_at: now,
            failed,
        };
        if self.history_limit > 0 {
            self.history.push_back(record);
            if self.history.len() > self.history_limit {
                let overflow = self.history.len() - self.history_limit;
                self.history.drain(0..overflow);
            }
        }
        Some(record)
    }

    /// Drops every pending command and the in-flight marker. History is kept.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.state = QueueState::Idle;
        self.in_flight_kind = None;
        dropped
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == QueueState::Idle
    }

    pub fn in_flight(&self) -> Option<CommandId> {
        match self.state {
            QueueState::Draining { in_flight } => Some(in_flight),
            QueueState::Idle => None,
        }
    }

    /// Number of commands still waiting, excluding the one in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> impl Iterator<Item = &CompletedCommand> {
        self.history.iter()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pause(ms: u64) -> Command {
        Command::Pause {
            duration: Duration::from_millis(ms),
        }
    }

    #[test]
    fn pops_in_fifo_order() {
        let mut queue = CommandQueue::default();
        let a = queue.push(pause(1));
        let b = queue.push(pause(2));

        let first = queue.start_next(Duration::ZERO).unwrap();
        assert_eq!(first.id, a);
        assert_eq!(queue.in_flight(), Some(a));
        queue.finish(Duration::from_millis(1), false);

        let second = queue.start_next(Duration::from_millis(1)).unwrap();
        assert_eq!(second.id, b);
        queue.finish(Duration::from_millis(3), false);

        assert!(queue.start_next(Duration::from_millis(3)).is_none());
        assert!(queue.is_idle());
    }

    #[test]
    fn finish_records_timing() {
        let mut queue = CommandQueue::default();
        queue.push(pause(5));
        queue.start_next(Duration::from_millis(2));
        let record = queue.finish(Duration::from_millis(7), true).unwrap();
        assert_eq!(record.kind, CommandKind::Pause);
        assert_eq!(record.started_at, Duration::from_millis(2));
        assert_eq!(record.finished_at, Duration::from_millis(7));
        assert!(record.failed);
        assert!(queue.finish(Duration::from_millis(8), false).is_none());
    }

    #[test]
    fn history_is_bounded() {
        let mut queue = CommandQueue::new(2);
        for ms in 0..5 {
            queue.push(pause(ms));
            queue.start_next(Duration::ZERO);
            queue.finish(Duration::ZERO, false);
        }
        let ids: Vec<u64> = queue.history().map(|record| record.id.0).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn clear_resets_to_idle() {
        let mut queue = CommandQueue::default();
        queue.push(pause(1));
        queue.push(pause(2));
        queue.start_next(Duration::ZERO);
        assert_eq!(queue.clear(), 1);
        assert!(queue.is_idle());
        assert!(queue.is_empty());
        assert!(queue.finish(Duration::ZERO, false).is_none());
    }
}
