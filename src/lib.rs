//! Strain-energy flattening of composite fiber courses.
//!
//! A course is a triangulated patch whose true in-plane shape is given per
//! triangle (the reference). The layout assigns every mesh vertex a 2-D
//! pattern position. [`evaluate_energy`] measures how much elastic energy the
//! layout stores relative to the reference, [`evaluate_gradient`] gives its
//! exact derivative, and [`optimize`] relaxes the layout by fixed-step
//! gradient descent.

pub mod datatypes;
pub mod energy;
pub mod error;
pub mod gradient;
pub mod input;
pub mod kinematics;
pub mod material;
pub mod optimizer;
pub mod post_processor;
pub mod problem;
pub mod projection;
pub mod tensor;

pub use datatypes::{
    flatten_layout, unflatten_layout, CourseMesh, Element, FlatteningResult, OptimizerSettings,
    ReferenceTriangle, Vertex,
};
pub use energy::evaluate_energy;
pub use error::FlattenError;
pub use gradient::evaluate_gradient;
pub use optimizer::{optimize, optimize_layout};
pub use problem::{ClosureObjective, StrainEnergyProblem};
