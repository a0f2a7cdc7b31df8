use thiserror::Error;

/// Why an archive document contributed no posts to the merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceRejection {
    #[error("not valid JSON: {0}")]
    Unparseable(String),
    #[error("no array, `orderedItems` or `posts` payload")]
    UnrecognizedShape,
    #[error("`{0}` payload is empty")]
    EmptyCollection(&'static str),
    #[error("`{0}` payload does not hold post objects")]
    NonPostCollection(&'static str),
}

impl SourceRejection {
    pub fn code(&self) -> WarnCode {
        match self {
            Self::Unparseable(_) => WarnCode::W001Unparseable,
            Self::UnrecognizedShape => WarnCode::W002UnrecognizedShape,
            Self::EmptyCollection(_) => WarnCode::W003EmptyCollection,
            Self::NonPostCollection(_) => WarnCode::W004NonPostCollection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnCode {
    W001Unparseable,
    W002UnrecognizedShape,
    W003EmptyCollection,
    W004NonPostCollection,
    W005MissingId,
    W006ProfileImageMissing,
}

impl WarnCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::W001Unparseable => "W001_UNPARSEABLE",
            Self::W002UnrecognizedShape => "W002_UNRECOGNIZED_SHAPE",
            Self::W003EmptyCollection => "W003_EMPTY_COLLECTION",
            Self::W004NonPostCollection => "W004_NON_POST_COLLECTION",
            Self::W005MissingId => "W005_MISSING_ID",
            Self::W006ProfileImageMissing => "W006_PROFILE_IMAGE_MISSING",
        }
    }
}
