use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeaError>;

#[derive(Error, Debug)]
pub enum FeaError {
    /// `nelx` or `nely` is zero.
    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    /// No solid elements, or nothing left to solve for.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The free-DOF stiffness matrix could not be solved reliably.
    #[error("singular system: {0}")]
    SingularSystem(String),

    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    #[error("invalid support: {0}")]
    InvalidSupport(String),

    /// Malformed edge or config input.
    #[error("input error: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
