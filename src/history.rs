use std::collections::VecDeque;

use crate::error::EditError;

pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Linear undo/redo stack of owned snapshots.
///
/// Pushing after an undo drops the redo branch. Once `limit` snapshots are
/// stored the oldest one is evicted.
#[derive(Debug, Clone)]
pub struct EditHistory<S> {
    snapshots: VecDeque<S>,
    position: Option<usize>,
    limit: usize,
}

impl<S> Default for EditHistory<S> {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl<S> EditHistory<S> {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            position: None,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Index of the current snapshot, `None` while empty.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<&S> {
        self.position.and_then(|p| self.snapshots.get(p))
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.position, Some(p) if p > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.position, Some(p) if p + 1 < self.snapshots.len())
    }

    pub fn push(&mut self, snapshot: S) {
        if let Some(p) = self.position {
            self.snapshots.truncate(p + 1);
        }
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.limit {
            self.snapshots.pop_front();
        }
        self.position = Some(self.snapshots.len() - 1);
    }

    pub fn undo(&mut self) -> Result<&S, EditError> {
        let p = match self.position {
            Some(p) if p > 0 => p - 1,
            _ => return Err(EditError::NothingToUndo),
        };
        self.position = Some(p);
        Ok(&self.snapshots[p])
    }

    pub fn redo(&mut self) -> Result<&S, EditError> {
        let p = match self.position {
            Some(p) if p + 1 < self.snapshots.len() => p + 1,
            _ => return Err(EditError::NothingToRedo),
        };
        self.position = Some(p);
        Ok(&self.snapshots[p])
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.position = None;
    }
}
