use std::collections::BTreeSet;
use std::sync::Mutex;

/// The prompts a session can raise, in protocol order. Phases 5 and 6
/// each raise two: a propagating prompt and an explicit revert prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PullDeletedLocal,
    PushDeletedRemote,
    PushNewRemote,
    PullNewLocal,
    PushModifiedRemote,
    RevertModifiedRemote,
    PullModifiedLocal,
    RevertModifiedLocal,
}

impl Phase {
    /// Question shown above the candidate list.
    pub fn question(&self) -> &'static str {
        match self {
            Phase::PullDeletedLocal => {
                "DOWNLOAD: delete these local files that were deleted on the remote?"
            }
            Phase::PushDeletedRemote => {
                "UPLOAD: delete these remote files that were deleted locally?"
            }
            Phase::PushNewRemote => {
                "UPLOAD: upload these new local files to the remote?"
            }
            Phase::PullNewLocal => {
                "DOWNLOAD: download these new files created on the remote?"
            }
            Phase::PushModifiedRemote => {
                "UPLOAD: update these remote files with your newer local changes?"
            }
            Phase::RevertModifiedRemote => {
                "UPLOAD: revert these remote files back to your older local versions?"
            }
            Phase::PullModifiedLocal => {
                "DOWNLOAD: update these local files with the newer remote changes?"
            }
            Phase::RevertModifiedLocal => {
                "DOWNLOAD: revert these local files back to the older remote versions?"
            }
        }
    }
}

/// One line of a candidate list shown to the user.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: String,
    /// Timestamps, editor, and any cross-reference warning.
    pub detail: String,
}

/// The user's answer to one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Empty response: skip this phase's transfers.
    Cancel,
    All,
    /// Zero-based indices into the displayed list.
    Indices(Vec<usize>),
}

impl Selection {
    /// Parse a console response: empty cancels, `all`/`a` selects
    /// everything, otherwise comma-separated zero-based indices.
    /// Tokens that are not valid numbers are ignored.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Selection::Cancel;
        }
        if trimmed.eq_ignore_ascii_case("all") || trimmed.eq_ignore_ascii_case("a") {
            return Selection::All;
        }
        let indices: Vec<usize> = trimmed
            .split(',')
            .filter_map(|tok| tok.trim().parse().ok())
            .collect();
        Selection::Indices(indices)
    }

    /// Resolve to in-range indices, deduplicated, in display order.
    pub fn resolve(&self, len: usize) -> Vec<usize> {
        match self {
            Selection::Cancel => Vec::new(),
            Selection::All => (0..len).collect(),
            Selection::Indices(indices) => {
                let set: BTreeSet<usize> = indices.iter().copied().filter(|i| *i < len).collect();
                set.into_iter().collect()
            }
        }
    }
}

/// Pure input/output contract for candidate selection. The orchestrator
/// never reads the console itself, which keeps sessions deterministic
/// under test.
pub trait SelectionPrompt: Send + Sync {
    fn select(&self, phase: Phase, candidates: &[Candidate]) -> Selection;
}

/// Replays a fixed sequence of answers; cancels once exhausted.
pub struct ScriptedPrompt {
    answers: Mutex<std::collections::VecDeque<Selection>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = Selection>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }
}

impl SelectionPrompt for ScriptedPrompt {
    fn select(&self, _phase: Phase, _candidates: &[Candidate]) -> Selection {
        self.answers
            .lock()
            .expect("prompt script lock")
            .pop_front()
            .unwrap_or(Selection::Cancel)
    }
}

/// Answers "all" to every prompt.
pub struct AllPrompt;

impl SelectionPrompt for AllPrompt {
    fn select(&self, _phase: Phase, _candidates: &[Candidate]) -> Selection {
        Selection::All
    }
}
