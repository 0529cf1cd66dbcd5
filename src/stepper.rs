use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::series::Snapshot;




/**
 * A running simulation that the animation driver advances in live mode.
 */
pub trait SimulationStepper {

    /// Take `n_steps` time steps.
    fn advance(&mut self, n_steps: u64) -> Result<()>;

    fn current_time(&self) -> f64;

    fn iteration(&self) -> u64;

    /// Return the current solution as a snapshot.
    fn snapshot(&self) -> Snapshot;
}




/**
 * What live mode publishes to its source cell after each callback: where
 * the simulation is, and what it looks like there.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub iteration: u64,
    pub time: f64,
    pub snapshot: Snapshot,
}

impl Tick {
    pub fn of<S: SimulationStepper + ?Sized>(stepper: &S) -> Self {
        Self {
            iteration: stepper.iteration(),
            time: stepper.current_time(),
            snapshot: stepper.snapshot(),
        }
    }
}




/**
 * Linear advection of a Gaussian pulse on a periodic unit interval, with a
 * first-order upwind scheme. It stands in for a real solver when exercising
 * live mode.
 */
pub struct Advection1d {
    velocity: f64,
    dx: f64,
    dt: f64,
    iteration: u64,
    time: f64,
    primitive: Vec<f64>,
}




// ============================================================================
impl Advection1d {

    pub fn new(num_cells: usize, velocity: f64, cfl: f64) -> Result<Self> {
        if num_cells == 0 || velocity == 0.0 || !(cfl > 0.0 && cfl <= 1.0) {
            return Err(Error::InvalidState("advection needs cells, a nonzero velocity, and 0 < cfl <= 1"));
        }
        let dx = 1.0 / num_cells as f64;
        let primitive = (0..num_cells)
            .map(|i| (i as f64 + 0.5) * dx)
            .map(|x| f64::exp(-1e2 * (x - 0.5).powi(2)))
            .collect();

        Ok(Self {
            velocity,
            dx,
            dt: cfl * dx / velocity.abs(),
            iteration: 0,
            time: 0.0,
            primitive,
        })
    }

    pub fn primitive(&self) -> &[f64] {
        &self.primitive
    }

    pub fn total(&self) -> f64 {
        self.primitive.iter().sum::<f64>() * self.dx
    }

    fn intercell_flux(&self) -> Vec<f64> {
        let n = self.primitive.len();
        (0..=n)
            .map(|i| {
                let il = (i + n - 1) % n;
                let ir = i % n;
                if self.velocity > 0.0 {
                    self.velocity * self.primitive[il]
                } else {
                    self.velocity * self.primitive[ir]
                }
            })
            .collect()
    }

    fn update(&mut self) -> Result<()> {
        let f = self.intercell_flux();
        let (dx, dt) = (self.dx, self.dt);

        for (u, w) in self.primitive.iter_mut().zip(f.windows(2)) {
            *u -= (w[1] - w[0]) * dt / dx;
        }
        if let Some(bad) = self.primitive.iter().find(|u| !u.is_finite()) {
            return Err(Error::Recompute {
                cell: "advection".into(),
                reason: format!("non-finite value {} at iteration {}", bad, self.iteration),
            });
        }
        self.iteration += 1;
        self.time += dt;
        Ok(())
    }
}

impl SimulationStepper for Advection1d {
    fn advance(&mut self, n_steps: u64) -> Result<()> {
        for _ in 0..n_steps {
            self.update()?;
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::from_function((1, self.primitive.len()), |_, j| self.primitive[j])
    }
}
