//! Builds inference pipelines from user requests.
//!
//! Audio is always produced, either by direct synthesis (`Cosy`) or by
//! cloud TTS followed by voice conversion (`Convert`). Video and subtitles
//! consume the audio output: alone they extend the chain, together they fan
//! out from it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vox_core::error::CoreError;
use vox_core::naming;
use vox_core::pipeline::{DispatchRecord, Handle, Pipeline, Stage, StageKind};
use vox_core::registry::{ModelProfile, ModelRegistry};
use vox_core::substrate::{ExecutionSubstrate, SubstrateError};

use crate::reconciler::{flatten, Role};

/// Cloud TTS voice used when the request does not name one.
pub const DEFAULT_AUDIO_PROFILE: &str = "zh-CN-YunxiNeural (Male)";

/// Mode flag passed to the direct-synthesis stage.
const COSY_SYNTHESIS_MODE: i64 = 1;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// How the audio output is produced. Serialised as `1` (convert) or
/// `2` (cosy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AudioMode {
    /// Cloud TTS, then voice conversion with the model's weights.
    #[default]
    Convert,
    /// Direct synthesis from the model's reference clip.
    Cosy,
}

impl TryFrom<u8> for AudioMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Convert),
            2 => Ok(Self::Cosy),
            other => Err(format!("unknown audio mode {other}, expected 1 or 2")),
        }
    }
}

impl From<AudioMode> for u8 {
    fn from(value: AudioMode) -> Self {
        match value {
            AudioMode::Convert => 1,
            AudioMode::Cosy => 2,
        }
    }
}

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct InferRequest {
    pub text: String,
    pub mode: AudioMode,
    /// Cloud TTS voice; only used in convert mode.
    pub audio_profile: String,
    pub video: bool,
    pub subtitles: bool,
}

/// Blob keys for every output of one request, sharing one uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub uid: String,
    pub audio: String,
    /// Cloud TTS output feeding voice conversion.
    pub intermediate_audio: Option<String>,
    pub video: Option<String>,
    pub subtitles: Option<String>,
}

impl OutputPlan {
    pub fn allocate(uid: &str, mode: AudioMode, video: bool, subtitles: bool) -> Self {
        let key = |suffix: &str| naming::output_key(uid, suffix);
        Self {
            uid: uid.to_string(),
            audio: key(naming::SUFFIX_AUDIO),
            intermediate_audio: (mode == AudioMode::Convert)
                .then(|| key(naming::SUFFIX_INTERMEDIATE_AUDIO)),
            video: video.then(|| key(naming::SUFFIX_VIDEO)),
            subtitles: subtitles.then(|| key(naming::SUFFIX_SUBTITLES)),
        }
    }

    pub fn for_request(uid: &str, request: &InferRequest) -> Self {
        Self::allocate(uid, request.mode, request.video, request.subtitles)
    }

    /// Every output key with the role it fills; the intermediate audio has
    /// no role.
    pub fn outputs(&self) -> Vec<(Option<Role>, &str)> {
        let mut out = Vec::with_capacity(4);
        if let Some(key) = &self.intermediate_audio {
            out.push((None, key.as_str()));
        }
        out.push((Some(Role::Audio), self.audio.as_str()));
        if let Some(key) = &self.video {
            out.push((Some(Role::Video), key.as_str()));
        }
        if let Some(key) = &self.subtitles {
            out.push((Some(Role::Srt), key.as_str()));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Request rejected before anything is recorded or submitted.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("model '{0}' not found")]
    UnknownModel(String),

    #[error("model '{0}' has no talking-head speaker configured")]
    MissingSpeaker(String),

    #[error("convert mode requires an intermediate audio output")]
    MissingIntermediateOutput,

    #[error("no output key allocated for {0}")]
    MissingOutput(&'static str),

    #[error("composed pipeline has an unsupported shape")]
    UnsupportedShape,

    #[error(transparent)]
    Registry(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Look up `model_name`, failing with [`CompositionError::UnknownModel`].
pub async fn resolve_profile(
    registry: &dyn ModelRegistry,
    model_name: &str,
) -> Result<ModelProfile, CompositionError> {
    registry
        .lookup(model_name)
        .await?
        .ok_or_else(|| CompositionError::UnknownModel(model_name.to_string()))
}

fn speaker_of(profile: &ModelProfile) -> Result<&str, CompositionError> {
    profile
        .speaker
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CompositionError::MissingSpeaker(profile.name.clone()))
}

fn stage(kind: StageKind, args: Vec<Value>, output: &str) -> Pipeline {
    Pipeline::Stage(Stage::new(kind, args, output))
}

/// Build the pipeline for a text request.
pub fn compose(
    request: &InferRequest,
    profile: &ModelProfile,
    plan: &OutputPlan,
) -> Result<Pipeline, CompositionError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(CompositionError::EmptyText);
    }

    let mut steps = match request.mode {
        AudioMode::Convert => {
            let intermediate = plan
                .intermediate_audio
                .as_deref()
                .ok_or(CompositionError::MissingIntermediateOutput)?;
            let (index_key, weight_key) = profile.conversion_assets();
            vec![
                stage(
                    StageKind::SynthesizeAzure,
                    vec![json!(text), json!(request.audio_profile)],
                    intermediate,
                ),
                stage(
                    StageKind::ConvertVoice,
                    vec![json!(index_key), json!(weight_key), json!(profile.pitch)],
                    &plan.audio,
                ),
            ]
        }
        AudioMode::Cosy => {
            let (prompt_text_key, prompt_wav_key) = profile.cosy_assets();
            vec![stage(
                StageKind::SynthesizeCosy,
                vec![
                    json!(text),
                    json!(prompt_text_key),
                    json!(prompt_wav_key),
                    json!(COSY_SYNTHESIS_MODE),
                ],
                &plan.audio,
            )]
        }
    };

    let render = if request.video {
        let speaker = speaker_of(profile)?;
        let output = plan
            .video
            .as_deref()
            .ok_or(CompositionError::MissingOutput("video"))?;
        Some(stage(
            StageKind::RenderTalkingHead,
            vec![json!(speaker)],
            output,
        ))
    } else {
        None
    };

    let align = if request.subtitles {
        let output = plan
            .subtitles
            .as_deref()
            .ok_or(CompositionError::MissingOutput("subtitles"))?;
        Some(stage(StageKind::AlignSubtitle, vec![json!(text)], output))
    } else {
        None
    };

    match (render, align) {
        (Some(render), Some(align)) => steps.push(Pipeline::fanout(vec![render, align])),
        (Some(next), None) | (None, Some(next)) => steps.push(next),
        (None, None) => {}
    }

    let pipeline = Pipeline::sequence(steps);
    if pipeline.shape().is_none() {
        return Err(CompositionError::UnsupportedShape);
    }
    Ok(pipeline)
}

/// Single talking-head stage rendering an existing audio blob.
pub fn compose_render(
    audio_key: &str,
    profile: &ModelProfile,
    video_output: &str,
) -> Result<Pipeline, CompositionError> {
    let speaker = speaker_of(profile)?;
    Ok(stage(
        StageKind::RenderTalkingHead,
        vec![json!(audio_key), json!(speaker)],
        video_output,
    ))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// A submitted pipeline: the substrate's receipt and its flattened handles.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub record: DispatchRecord,
    pub handles: Vec<Handle>,
}

/// Submit `pipeline` and flatten the receipt.
pub async fn dispatch(
    substrate: &dyn ExecutionSubstrate,
    pipeline: &Pipeline,
) -> Result<Dispatched, SubstrateError> {
    let record = substrate.submit(pipeline).await?;
    if !record.mirrors(pipeline) {
        return Err(SubstrateError::ShapeMismatch);
    }
    let handles = flatten(&record);
    tracing::info!(
        handles = handles.len(),
        first = %handles.first().map(Handle::as_str).unwrap_or_default(),
        "Pipeline dispatched",
    );
    Ok(Dispatched { record, handles })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use vox_core::pipeline::PipelineShape;

    use super::*;

    fn profile(speaker: Option<&str>) -> ModelProfile {
        ModelProfile {
            name: "anna".into(),
            speaker: speaker.map(Into::into),
            pitch: 3,
        }
    }

    fn request(mode: AudioMode, video: bool, subtitles: bool) -> InferRequest {
        InferRequest {
            text: "hello there".into(),
            mode,
            audio_profile: DEFAULT_AUDIO_PROFILE.into(),
            video,
            subtitles,
        }
    }

    fn kinds(p: &Pipeline) -> Vec<StageKind> {
        p.stages().iter().map(|s| s.kind).collect()
    }

    #[test]
    fn plan_allocates_keys_per_requested_output() {
        let plan = OutputPlan::allocate("u1", AudioMode::Convert, true, false);
        assert_eq!(plan.audio, "infer/u1.wav");
        assert_eq!(plan.intermediate_audio.as_deref(), Some("infer/u1.azure.wav"));
        assert_eq!(plan.video.as_deref(), Some("infer/u1.mp4"));
        assert_eq!(plan.subtitles, None);

        let cosy = OutputPlan::allocate("u2", AudioMode::Cosy, false, true);
        assert_eq!(cosy.intermediate_audio, None);
        assert_eq!(cosy.subtitles.as_deref(), Some("infer/u2.srt"));
        assert_eq!(
            cosy.outputs(),
            vec![(Some(Role::Audio), "infer/u2.wav"), (Some(Role::Srt), "infer/u2.srt")]
        );
    }

    #[test]
    fn convert_with_video_and_subtitles_fans_out() {
        let req = request(AudioMode::Convert, true, true);
        let plan = OutputPlan::for_request("u", &req);
        let p = compose(&req, &profile(Some("spk")), &plan).unwrap();

        assert_eq!(
            p.shape(),
            Some(PipelineShape::ChainWithFanout {
                stages: 2,
                branches: 2
            })
        );
        assert_eq!(
            kinds(&p),
            vec![
                StageKind::SynthesizeAzure,
                StageKind::ConvertVoice,
                StageKind::RenderTalkingHead,
                StageKind::AlignSubtitle,
            ]
        );

        let stages = p.stages();
        assert_eq!(stages[0].args, vec![json!("hello there"), json!(DEFAULT_AUDIO_PROFILE)]);
        assert_eq!(stages[0].output, "infer/u.azure.wav");
        assert_eq!(
            stages[1].args,
            vec![json!("model/rvc/anna.index"), json!("model/rvc/anna.pth"), json!(3)]
        );
        assert_eq!(stages[1].output, "infer/u.wav");
        assert_eq!(stages[2].args, vec![json!("spk")]);
        assert_eq!(stages[3].args, vec![json!("hello there")]);
    }

    #[test]
    fn convert_alone_is_a_two_stage_chain() {
        let req = request(AudioMode::Convert, false, false);
        let plan = OutputPlan::for_request("u", &req);
        let p = compose(&req, &profile(None), &plan).unwrap();

        assert_eq!(p.shape(), Some(PipelineShape::Chain(2)));
        assert_eq!(kinds(&p), vec![StageKind::SynthesizeAzure, StageKind::ConvertVoice]);
    }

    #[test]
    fn cosy_alone_is_a_single_stage() {
        let req = request(AudioMode::Cosy, false, false);
        let plan = OutputPlan::for_request("u", &req);
        let p = compose(&req, &profile(None), &plan).unwrap();

        assert_eq!(p.shape(), Some(PipelineShape::Single));
        assert_eq!(
            p.stages()[0].args,
            vec![
                json!("hello there"),
                json!("model/cosy/anna.lab"),
                json!("model/cosy/anna.wav"),
                json!(1)
            ]
        );
    }

    #[test]
    fn subtitles_alone_extend_the_chain() {
        let req = request(AudioMode::Cosy, false, true);
        let plan = OutputPlan::for_request("u", &req);
        let p = compose(&req, &profile(None), &plan).unwrap();

        assert_eq!(p.shape(), Some(PipelineShape::Chain(2)));
        assert_eq!(kinds(&p), vec![StageKind::SynthesizeCosy, StageKind::AlignSubtitle]);
    }

    #[test]
    fn inconsistent_requests_fail_fast() {
        let video = request(AudioMode::Cosy, true, false);
        let plan = OutputPlan::for_request("u", &video);
        assert_matches!(
            compose(&video, &profile(None), &plan),
            Err(CompositionError::MissingSpeaker(name)) if name == "anna"
        );
        assert_matches!(
            compose(&video, &profile(Some("  ")), &plan),
            Err(CompositionError::MissingSpeaker(_))
        );

        let convert = request(AudioMode::Convert, false, false);
        let cosy_plan = OutputPlan::allocate("u", AudioMode::Cosy, false, false);
        assert_matches!(
            compose(&convert, &profile(None), &cosy_plan),
            Err(CompositionError::MissingIntermediateOutput)
        );

        let mut empty = request(AudioMode::Cosy, false, false);
        empty.text = "   ".into();
        let plan = OutputPlan::for_request("u", &empty);
        assert_matches!(
            compose(&empty, &profile(None), &plan),
            Err(CompositionError::EmptyText)
        );
    }

    #[test]
    fn standalone_render_takes_audio_key_first() {
        let p = compose_render("upload/1/x/a.wav", &profile(Some("spk")), "infer/v.mp4").unwrap();
        assert_eq!(p.shape(), Some(PipelineShape::Single));
        assert_eq!(p.stages()[0].args, vec![json!("upload/1/x/a.wav"), json!("spk")]);

        assert_matches!(
            compose_render("a", &profile(None), "v"),
            Err(CompositionError::MissingSpeaker(_))
        );
    }

    #[test]
    fn audio_mode_wire_values() {
        assert_eq!(serde_json::to_value(AudioMode::Convert).unwrap(), json!(1));
        assert_eq!(
            serde_json::from_value::<AudioMode>(json!(2)).unwrap(),
            AudioMode::Cosy
        );
        assert!(serde_json::from_value::<AudioMode>(json!(3)).is_err());
    }
}
