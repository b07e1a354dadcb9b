use std::sync::Arc;

use argmin::core::{CostFunction, Error, Gradient};
use nalgebra::Matrix3;

use crate::{
    datatypes::CourseMesh, energy::evaluate_energy, error::FlattenError,
    gradient::evaluate_gradient,
};

/// Strain energy of a course layout, as an argmin objective over the flat
/// layout vector
#[derive(Debug, Clone)]
pub struct StrainEnergyProblem {
    mesh: Arc<CourseMesh>,
    stiffness: Matrix3<f64>,
}

impl StrainEnergyProblem {
    pub fn new(mesh: CourseMesh, stiffness: Matrix3<f64>) -> StrainEnergyProblem {
        StrainEnergyProblem {
            mesh: Arc::new(mesh),
            stiffness,
        }
    }

    pub fn mesh(&self) -> &CourseMesh {
        &self.mesh
    }

    pub fn stiffness(&self) -> &Matrix3<f64> {
        &self.stiffness
    }

    pub fn strain_energy(&self, layout: &[f64]) -> Result<f64, FlattenError> {
        evaluate_energy(
            &self.mesh.reference,
            layout,
            &self.mesh.elements,
            &self.stiffness,
        )
    }

    pub fn strain_energy_gradient(&self, layout: &[f64]) -> Result<Vec<f64>, FlattenError> {
        evaluate_gradient(
            &self.mesh.reference,
            layout,
            &self.mesh.elements,
            &self.stiffness,
        )
    }
}

impl CostFunction for StrainEnergyProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.strain_energy(param)?)
    }
}

impl Gradient for StrainEnergyProblem {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.strain_energy_gradient(param)?)
    }
}

/// Wraps a pair of plain functions as an objective and its gradient
#[derive(Clone)]
pub struct ClosureObjective<F, G> {
    cost: F,
    gradient: G,
}

impl<F, G> ClosureObjective<F, G>
where
    F: Fn(&[f64]) -> Result<f64, FlattenError>,
    G: Fn(&[f64]) -> Result<Vec<f64>, FlattenError>,
{
    pub fn new(cost: F, gradient: G) -> ClosureObjective<F, G> {
        ClosureObjective { cost, gradient }
    }
}

impl<F, G> CostFunction for ClosureObjective<F, G>
where
    F: Fn(&[f64]) -> Result<f64, FlattenError>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok((self.cost)(param.as_slice())?)
    }
}

impl<F, G> Gradient for ClosureObjective<F, G>
where
    G: Fn(&[f64]) -> Result<Vec<f64>, FlattenError>,
{
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok((self.gradient)(param.as_slice())?)
    }
}
