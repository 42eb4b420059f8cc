use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported latitude {lat}: UTM tiling is limited to ±{limit} degrees")]
    UnsupportedLatitude { lat: f64, limit: f64 },

    #[error("Invalid tile key {key:?}: {reason}")]
    KeyParse { key: String, reason: String },

    #[error("Projection error: {0}")]
    Projection(#[from] ProjError),

    #[error("Invalid affine transform: {0}")]
    Affine(String),
}

impl TileError {
    pub(crate) fn key_parse(key: &str, reason: impl Into<String>) -> Self {
        TileError::KeyParse {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProjError {
    #[error("Transform failed: {0}")]
    TransformFailed(String),
}
