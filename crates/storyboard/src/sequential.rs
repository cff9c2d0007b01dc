use serde::{Deserialize, Serialize};

/// Where a blocking scene-by-scene run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequentialStatus {
    /// Candidates for this scene have to be requested.
    NeedsCandidates(u32),
    /// Candidates exist; a pick is required before moving on.
    AwaitingPick(u32),
    Finished,
}

/// Cursor of a sequential run over the overview entries.
///
/// The next scene only becomes current once the current one has a pick,
/// and that pick seeds the next scene's generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequentialRun {
    cursor: usize,
}

impl SequentialRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }
}
