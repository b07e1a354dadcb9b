use std::sync::{Arc, Mutex};

use argmin::{
    core::{
        observers::{Observe, ObserverMode},
        CostFunction, Error, Executor, Gradient, State, KV,
    },
    solver::landweber::Landweber,
};
use argmin_observer_slog::SlogLogger;
use indicatif::ProgressBar;

use crate::{
    datatypes::{flatten_layout, unflatten_layout, FlatteningResult, OptimizerSettings, Vertex},
    error::FlattenError,
    problem::StrainEnergyProblem,
};

/// Upper bound on the trajectory entries reserved before the run starts
const TRAJECTORY_RESERVE_LIMIT: u64 = 1 << 16;

/// Records the objective at every accepted layout
struct EnergyRecorder<O> {
    objective: O,
    trajectory: Arc<Mutex<Vec<f64>>>,
}

impl<O, I> Observe<I> for EnergyRecorder<O>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
    I: State<Param = Vec<f64>>,
{
    fn observe_init(&mut self, _name: &str, _state: &I, _kv: &KV) -> Result<(), Error> {
        Ok(())
    }

    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        let layout = state
            .get_param()
            .ok_or_else(|| FlattenError::Solver("descent state holds no layout".to_owned()))?;
        let energy = self.objective.cost(layout)?;

        self.trajectory
            .lock()
            .map_err(|_| FlattenError::Solver("energy trajectory lock poisoned".to_owned()))?
            .push(energy);

        Ok(())
    }

    fn observe_final(&mut self, _state: &I) -> Result<(), Error> {
        Ok(())
    }
}

/// Observer bar for the descent iterations
struct DescentObserverBar {
    bar: ProgressBar,
}

impl DescentObserverBar {
    fn new(iterations: u64) -> DescentObserverBar {
        DescentObserverBar {
            bar: ProgressBar::new(iterations),
        }
    }
}

impl<I> Observe<I> for DescentObserverBar
where
    I: State,
{
    fn observe_init(&mut self, _name: &str, _state: &I, _kv: &KV) -> Result<(), Error> {
        Ok(())
    }

    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        self.bar.set_position(state.get_iter() + 1);
        Ok(())
    }

    fn observe_final(&mut self, _state: &I) -> Result<(), Error> {
        self.bar.finish();
        Ok(())
    }
}

/// Relaxes a layout by fixed-step gradient descent
///
/// Every iteration takes `x <- x - step_size * grad(x)` and records the
/// objective at the new `x`. The run stops after exactly
/// `settings.iterations` iterations; any error from the objective ends it.
///
/// The objective must be `'static`: a clone of it is boxed into the energy
/// observer that argmin's executor owns. Closures should capture owned or
/// `Arc`-shared data rather than borrows.
///
/// # Arguments
/// * `objective` - Supplies the energy and its gradient over the flat layout
/// * `initial_layout` - The starting position of every layout vertex
/// * `settings` - Step size, iteration budget and display options
///
/// # Returns
/// The final layout and the energy after each iteration
pub fn optimize<O>(
    objective: O,
    initial_layout: &[Vertex],
    settings: &OptimizerSettings,
) -> Result<FlatteningResult, FlattenError>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>
        + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>
        + Clone
        + 'static,
{
    if !(settings.step_size.is_finite() && settings.step_size > 0.0) {
        return Err(FlattenError::Input(format!(
            "Step size must be positive and finite, got {}",
            settings.step_size
        )));
    }

    let initial_param = flatten_layout(initial_layout);
    let initial_energy = objective
        .cost(&initial_param)
        .map_err(FlattenError::from_argmin)?;

    let reserved = settings.iterations.min(TRAJECTORY_RESERVE_LIMIT) as usize;
    let trajectory = Arc::new(Mutex::new(Vec::with_capacity(reserved)));
    let recorder = EnergyRecorder {
        objective: objective.clone(),
        trajectory: Arc::clone(&trajectory),
    };

    let solver: Landweber<f64> = Landweber::new(settings.step_size);
    let mut executor = Executor::new(objective, solver)
        .configure(|state| state.param(initial_param).max_iters(settings.iterations))
        .add_observer(recorder, ObserverMode::Always);

    if settings.show_progress {
        executor = executor.add_observer(
            DescentObserverBar::new(settings.iterations),
            ObserverMode::Always,
        );
    }
    if settings.log_iterations {
        executor = executor.add_observer(SlogLogger::term(), ObserverMode::Always);
    }

    let res = executor.run().map_err(FlattenError::from_argmin)?;

    let layout = match res.state().get_param() {
        Some(param) => unflatten_layout(param)?,
        None => {
            return Err(FlattenError::Solver(
                "Fixed-step descent could not produce a final layout".to_owned(),
            ))
        }
    };

    let energy_trajectory = match trajectory.lock() {
        Ok(mut recorded) => std::mem::take(&mut *recorded),
        Err(_) => {
            return Err(FlattenError::Solver(
                "energy trajectory lock poisoned".to_owned(),
            ))
        }
    };

    Ok(FlatteningResult {
        layout,
        initial_energy,
        energy_trajectory,
    })
}

/// Relaxes the layout of a course mesh against its reference shape
///
/// # Arguments
/// * `problem` - The course mesh and its stiffness
/// * `initial_layout` - One layout vertex per mesh vertex
/// * `settings` - Step size, iteration budget and display options
pub fn optimize_layout(
    problem: &StrainEnergyProblem,
    initial_layout: &[Vertex],
    settings: &OptimizerSettings,
) -> Result<FlatteningResult, FlattenError> {
    if initial_layout.len() != problem.mesh().vertex_count {
        return Err(FlattenError::ShapeMismatch(format!(
            "initial layout has {} vertices but the mesh has {}",
            initial_layout.len(),
            problem.mesh().vertex_count
        )));
    }

    optimize(problem.clone(), initial_layout, settings)
}
