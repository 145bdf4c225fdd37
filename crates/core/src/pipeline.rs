//! Pipeline trees, their dispatch receipts, and remote poll results.
//!
//! A [`Pipeline`] is what gets submitted to the execution substrate: a tree
//! of [`Stage`]s combined by sequence (ordered dependency, each stage consumes
//! its parent's output) and fan-out (independent branches sharing one input,
//! never rejoined). The substrate answers with a [`DispatchRecord`] of the
//! same shape whose leaves are opaque [`Handle`]s.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::RemoteState;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Kind of remote inference a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Zero-shot synthesis from a reference clip.
    SynthesizeCosy,
    /// Cloud TTS; output is converted to the target voice afterwards.
    SynthesizeAzure,
    ConvertVoice,
    AlignSubtitle,
    RenderTalkingHead,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SynthesizeCosy => "synthesize_cosy",
            Self::SynthesizeAzure => "synthesize_azure",
            Self::ConvertVoice => "convert_voice",
            Self::AlignSubtitle => "align_subtitle",
            Self::RenderTalkingHead => "render_talking_head",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote invocation.
///
/// `args` are the ordered explicit inputs. When the stage runs inside a
/// sequence, the substrate prepends the parent stage's output to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub kind: StageKind,
    pub args: Vec<serde_json::Value>,
    /// Blob key the stage writes and reports back on success.
    pub output: String,
}

impl Stage {
    pub fn new(kind: StageKind, args: Vec<serde_json::Value>, output: impl Into<String>) -> Self {
        Self {
            kind,
            args,
            output: output.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A tree of stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pipeline {
    Stage(Stage),
    Sequence { steps: Vec<Pipeline> },
    Fanout { branches: Vec<Pipeline> },
}

/// The only tree shapes the composer is allowed to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineShape {
    Single,
    /// A sequence of `n` plain stages.
    Chain(usize),
    /// A sequence of `stages` plain stages followed by a fan-out of
    /// `branches` plain stages.
    ChainWithFanout { stages: usize, branches: usize },
}

/// Maximum number of branches in a trailing fan-out.
pub const MAX_FANOUT_BRANCHES: usize = 2;

impl Pipeline {
    /// Wrap `steps` in a sequence, or return the lone step unwrapped.
    pub fn sequence(mut steps: Vec<Pipeline>) -> Self {
        if steps.len() == 1 {
            steps.remove(0)
        } else {
            Self::Sequence { steps }
        }
    }

    pub fn fanout(branches: Vec<Pipeline>) -> Self {
        Self::Fanout { branches }
    }

    /// All stages, depth-first, parent before children, branches in
    /// declaration order.
    pub fn stages(&self) -> Vec<&Stage> {
        let mut out = Vec::new();
        self.collect_stages(&mut out);
        out
    }

    fn collect_stages<'a>(&'a self, out: &mut Vec<&'a Stage>) {
        match self {
            Self::Stage(stage) => out.push(stage),
            Self::Sequence { steps } => steps.iter().for_each(|s| s.collect_stages(out)),
            Self::Fanout { branches } => branches.iter().for_each(|b| b.collect_stages(out)),
        }
    }

    /// Classify the tree, or `None` if it is outside the allowed shapes.
    pub fn shape(&self) -> Option<PipelineShape> {
        match self {
            Self::Stage(_) => Some(PipelineShape::Single),
            Self::Fanout { .. } => None,
            Self::Sequence { steps } => {
                let (last, head) = steps.split_last()?;
                if !head.iter().all(|s| matches!(s, Self::Stage(_))) {
                    return None;
                }
                match last {
                    Self::Stage(_) if steps.len() >= 2 => Some(PipelineShape::Chain(steps.len())),
                    Self::Fanout { branches }
                        if !head.is_empty()
                            && (1..=MAX_FANOUT_BRANCHES).contains(&branches.len())
                            && branches.iter().all(|b| matches!(b, Self::Stage(_))) =>
                    {
                        Some(PipelineShape::ChainWithFanout {
                            stages: head.len(),
                            branches: branches.len(),
                        })
                    }
                    _ => None,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch receipts
// ---------------------------------------------------------------------------

/// Opaque reference to one submitted stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub String);

impl Handle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Receipt for a submitted [`Pipeline`], mirroring its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchRecord {
    Leaf { handle: Handle },
    Sequence { steps: Vec<DispatchRecord> },
    Fanout { branches: Vec<DispatchRecord> },
}

impl DispatchRecord {
    pub fn leaf(handle: impl Into<Handle>) -> Self {
        Self::Leaf {
            handle: handle.into(),
        }
    }

    /// Whether this record has exactly the structure of `pipeline`.
    pub fn mirrors(&self, pipeline: &Pipeline) -> bool {
        match (self, pipeline) {
            (Self::Leaf { .. }, Pipeline::Stage(_)) => true,
            (Self::Sequence { steps: r }, Pipeline::Sequence { steps: p })
            | (Self::Fanout { branches: r }, Pipeline::Fanout { branches: p }) => {
                r.len() == p.len() && r.iter().zip(p).all(|(r, p)| r.mirrors(p))
            }
            _ => false,
        }
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Outcome of polling one handle.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResult {
    pub state: RemoteState,
    /// State string exactly as the worker reported it.
    pub raw_state: String,
    /// Declared output value; on success this should equal the stage's
    /// output blob key.
    pub output: Option<serde_json::Value>,
}

impl RemoteResult {
    pub fn from_reported(raw_state: impl Into<String>, output: Option<serde_json::Value>) -> Self {
        let raw_state = raw_state.into();
        Self {
            state: RemoteState::from_reported(&raw_state),
            raw_state,
            output,
        }
    }

    /// The reported output as a blob key, if it is a string.
    pub fn output_key(&self) -> Option<&str> {
        self.output.as_ref().and_then(|v| v.as_str())
    }
}
