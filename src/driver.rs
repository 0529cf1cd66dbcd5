use std::ops::RangeInclusive;
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use crate::capture::{FrameSink, NoCapture};
use crate::cell::Observable;
use crate::error::{Error, Result};
use crate::index::FrameIndex;
use crate::render::SharedSurface;
use crate::stepper::{SimulationStepper, Tick};




/// Sent to a running driver to make it stop at the next frame boundary.
#[derive(Debug)]
pub enum Signal {
    Stop,
}




#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Completed,
    Aborted,
}




/**
 * How the driver advances its source cell.
 *
 * - `Offline` sets a frame index to each value of a fixed range in turn,
 *   replaying a precomputed time series.
 * - `Live` advances a simulation by `steps_per_tick` steps, `ticks` times,
 *   publishing a [`Tick`] to the source cell after each advance.
 */
pub enum Mode<'a> {
    Offline {
        index: &'a FrameIndex,
        frames: RangeInclusive<usize>,
    },
    Live {
        stepper: &'a mut dyn SimulationStepper,
        source: &'a Observable<Tick>,
        ticks: usize,
        steps_per_tick: u64,
    },
}




/// What happened during a run that reached `Completed`.
#[derive(Debug, Default)]
pub struct RunReport {
    pub frames: usize,
    pub captured: usize,
    pub rendering_errors: Vec<(usize, Error)>,
}




/**
 * Advances a source cell frame by frame and captures what the surface shows
 * after each advance.
 *
 * A run goes `Idle -> Running -> Completed | Aborted`. On each advance the
 * source cell is set, its cascade runs to completion, and only then is the
 * surface captured, so the frame captured for index `i` always reflects the
 * fully propagated state for `i`.
 *
 * Rendering errors that leave the cell graph usable (shape mismatches) are
 * logged, recorded in the [`RunReport`] against their frame, and the run
 * goes on. Any other failure (a failed recompute, a failed capture, a
 * simulation error) aborts the run: the sink's partial output is discarded
 * and the error is returned wrapped with the frame index at which it
 * occurred. A stop signal is checked between frames, never mid-cascade.
 */
pub struct AnimationDriver<K: FrameSink = NoCapture> {
    surface: SharedSurface,
    sink: K,
    stop: Option<Receiver<Signal>>,
    state: DriverState,
}




// ============================================================================
impl AnimationDriver<NoCapture> {

    pub fn new(surface: &SharedSurface) -> Self {
        Self {
            surface: surface.clone(),
            sink: NoCapture,
            stop: None,
            state: DriverState::Idle,
        }
    }
}




// ============================================================================
impl<K: FrameSink> AnimationDriver<K> {

    /// Capture each frame into the given sink.
    pub fn with_sink<S: FrameSink>(self, sink: S) -> AnimationDriver<S> {
        AnimationDriver {
            surface: self.surface,
            sink,
            stop: self.stop,
            state: self.state,
        }
    }

    pub fn with_stop_signal(mut self, stop: Receiver<Signal>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Return a finished driver to `Idle` so it can run again.
    pub fn reset(&mut self) -> Result<()> {
        match self.state {
            DriverState::Running => Err(Error::InvalidState("cannot reset a running driver")),
            _ => {
                self.state = DriverState::Idle;
                Ok(())
            }
        }
    }

    /**
     * Run the animation to completion. The range of an offline run is
     * checked against the frame index before anything happens, and a bad
     * range leaves the driver `Idle`.
     */
    pub fn start(&mut self, mode: Mode<'_>) -> Result<RunReport> {
        if self.state != DriverState::Idle {
            return Err(Error::InvalidState("driver must be idle to start"));
        }

        let result = match mode {
            Mode::Offline { index, frames } => {
                index.validate(*frames.start())?;
                index.validate(*frames.end())?;
                info!("offline run over frames {}..={}", frames.start(), frames.end());

                self.state = DriverState::Running;
                self.run(frames, |i| index.set(i))
            }
            Mode::Live { stepper, source, ticks, steps_per_tick } => {
                info!("live run: {} ticks of {} steps", ticks, steps_per_tick);

                self.state = DriverState::Running;
                self.run(1..=ticks, |_| {
                    stepper.advance(steps_per_tick).map_err(|e| Error::Recompute {
                        cell: "simulation".into(),
                        reason: e.to_string(),
                    })?;
                    source.set(Tick::of(&*stepper))
                })
            }
        };

        self.finalize(result)
    }

    fn run<I, F>(&mut self, frames: I, mut advance: F) -> Result<RunReport>
    where
        I: IntoIterator<Item = usize>,
        F: FnMut(usize) -> Result<()>,
    {
        let mut report = RunReport::default();
        let mut last = 0;

        for index in frames {
            if let Some(stop) = &self.stop {
                if let Ok(Signal::Stop) = stop.try_recv() {
                    info!("received stop signal");
                    return Err(Error::Cancelled { index: last });
                }
            }

            match advance(index) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    warn!("frame {}: {}", index, e);
                    report.rendering_errors.push((index, e));
                }
                Err(e) => {
                    return Err(Error::Frame {
                        index,
                        source: Box::new(e),
                    })
                }
            }

            if self.sink.enabled() {
                let frame = self.surface.borrow().frame();
                self.sink.capture(index, &frame).map_err(|e| Error::Frame {
                    index,
                    source: Box::new(e),
                })?;
                report.captured += 1;
            }

            debug!("frame {} done", index);
            report.frames += 1;
            last = index;
        }
        Ok(report)
    }

    fn finalize(&mut self, result: Result<RunReport>) -> Result<RunReport> {
        let result = result.and_then(|report| {
            self.sink.finish().map_err(|e| Error::Frame {
                index: report.frames,
                source: Box::new(e),
            })?;
            Ok(report)
        });

        match &result {
            Ok(report) => {
                self.state = DriverState::Completed;
                info!(
                    "completed {} frames ({} captured, {} rendering errors)",
                    report.frames,
                    report.captured,
                    report.rendering_errors.len()
                );
            }
            Err(e) => {
                self.sink.discard();
                self.state = DriverState::Aborted;
                error!("{}", e);
            }
        }
        result
    }
}
