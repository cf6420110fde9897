use thiserror::Error;

/// Failures surfaced by the edit pipeline core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("no source image loaded")]
    NoSourceImage,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("render failed: {0}")]
    RenderFailure(String),
    #[error("invalid stage parameter: {0}")]
    InvalidStage(String),
    #[error("crop failed: {0}")]
    CropFailed(String),
    #[error("save failed: {0}")]
    SaveFailed(String),
}
