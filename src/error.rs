use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum FlattenError {
    /// A layout triangle has (numerically) zero area, so its homogeneous
    /// matrix cannot be inverted.
    DegenerateElement { element: usize, area: f64 },
    /// Reference triangles, connectivity and layout disagree in size.
    ShapeMismatch(String),
    /// An energy or gradient value came out as `inf` or `NaN`. `element` is
    /// `None` when only the mesh-wide sum overflowed.
    NonFiniteResult {
        element: Option<usize>,
        quantity: &'static str,
    },
    Input(String),
    Solver(String),
    PostProcessor(String),
}

impl Display for FlattenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlattenError::DegenerateElement { element, area } => write!(
                f,
                "Degenerate element error: triangle {element} has uv area {area:e}"
            ),
            FlattenError::NonFiniteResult {
                element: Some(element),
                quantity,
            } => write!(
                f,
                "Non-finite result error: {quantity} of triangle {element} is not finite"
            ),
            FlattenError::NonFiniteResult {
                element: None,
                quantity,
            } => write!(f, "Non-finite result error: total {quantity} is not finite"),
            FlattenError::ShapeMismatch(v) => write!(f, "Shape mismatch error: {}", v),
            FlattenError::Input(v) => write!(f, "Input error: {}", v),
            FlattenError::Solver(v) => write!(f, "Solver error: {}", v),
            FlattenError::PostProcessor(v) => write!(f, "Post Processor error: {}", v),
        }
    }
}

impl std::error::Error for FlattenError {}

impl FlattenError {
    /// Recovers a kernel error that travelled through argmin's executor.
    /// Anything else is reported as a solver failure.
    pub fn from_argmin(err: argmin::core::Error) -> FlattenError {
        match err.downcast::<FlattenError>() {
            Ok(e) => e,
            Err(other) => FlattenError::Solver(format!("fixed-step descent error: {other}")),
        }
    }
}
