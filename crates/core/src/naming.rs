//! Blob key conventions.
//!
//! Generated outputs live under `infer/`, model assets under `model/`.
//! All keys produced here are plain `/`-separated strings understood by every
//! [`BlobStore`](crate::storage::BlobStore).

/// Prefix for every generated inference output.
pub const INFER_PREFIX: &str = "infer";

/// Suffix of the final audio output.
pub const SUFFIX_AUDIO: &str = ".wav";
/// Suffix of the intermediate cloud-TTS audio in convert mode.
pub const SUFFIX_INTERMEDIATE_AUDIO: &str = ".azure.wav";
pub const SUFFIX_VIDEO: &str = ".mp4";
pub const SUFFIX_SUBTITLES: &str = ".srt";

/// New random id shared by all outputs of one request.
pub fn new_output_uid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// File name for an output: `<uid><suffix>`.
pub fn output_name(uid: &str, suffix: &str) -> String {
    format!("{uid}{suffix}")
}

/// Blob key for an output: `infer/<uid><suffix>`.
pub fn output_key(uid: &str, suffix: &str) -> String {
    format!("{INFER_PREFIX}/{}", output_name(uid, suffix))
}

/// Blob key for a user upload: `upload/<user>/<uid>/<file name>`.
///
/// Only the final path component of `file_name` is kept.
pub fn upload_key(user_id: crate::types::UserId, uid: &str, file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("upload.bin");
    format!("upload/{user_id}/{uid}/{base}")
}

/// Reference transcript and reference clip keys for direct synthesis.
pub fn cosy_asset_keys(model_name: &str) -> (String, String) {
    (
        format!("model/cosy/{model_name}.lab"),
        format!("model/cosy/{model_name}.wav"),
    )
}

/// Feature index and weight keys for voice conversion.
pub fn conversion_asset_keys(model_name: &str) -> (String, String) {
    (
        format!("model/rvc/{model_name}.index"),
        format!("model/rvc/{model_name}.pth"),
    )
}
