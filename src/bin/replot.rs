use std::error::Error;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;
use log::{info, warn, LevelFilter};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use simple_logger::SimpleLogger;

use replot::binding::PlotBinding;
use replot::capture::FrameFile;
use replot::cell::Observable;
use replot::derived::Derived;
use replot::driver::{AnimationDriver, Mode, Signal};
use replot::index::FrameIndex;
use replot::render::{Canvas, PrimitiveKind, SharedSurface, Style};
use replot::series::{window_color_range, Snapshot, TimeSeries, TimeSeriesStore, DEFAULT_COLOR_WINDOW};
use replot::stepper::{Advection1d, Tick};




#[derive(Debug, Parser)]
#[clap(version, about = "Render animation frames from stored or live simulation output")]
struct Opts {
    #[clap(long, default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a stored time series
    Offline(OfflineOpts),
    /// Drive a 1D advection run and plot it as it goes
    Live(LiveOpts),
    /// Write a synthetic time series to disk
    Synth(SynthOpts),
}

#[derive(Debug, Args)]
struct OfflineOpts {
    #[clap(short, long)]
    series: PathBuf,

    #[clap(long)]
    first: Option<usize>,

    #[clap(long)]
    last: Option<usize>,

    /// Number of samples in the color-range window
    #[clap(short, long, default_value_t = DEFAULT_COLOR_WINDOW, parse(try_from_str = parse_window))]
    window: usize,

    #[clap(short, long, default_value = "frames.cbor")]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct LiveOpts {
    #[clap(short, long, default_value = "200")]
    cells: usize,

    #[clap(short, long, default_value = "100")]
    ticks: usize,

    #[clap(short = 'n', long, default_value = "10")]
    steps_per_tick: u64,

    #[clap(long, default_value = "0.5")]
    cfl: f64,

    #[clap(short, long, default_value = "frames.cbor")]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct SynthOpts {
    #[clap(short, long, default_value = "64")]
    frames: usize,

    #[clap(short, long, default_value = "32")]
    resolution: usize,

    #[clap(short, long)]
    output: PathBuf,
}




// ============================================================================
fn stop_on_interrupt() -> Result<Receiver<Signal>, Box<dyn Error>> {
    let (sink, source) = crossbeam_channel::bounded(1);
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;

    thread::spawn(move || {
        for signal in signals.forever() {
            warn!("caught signal {}, stopping after the current frame", signal);
            let _ = sink.try_send(Signal::Stop);
        }
    });
    Ok(source)
}

fn parse_window(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(0) => Err("the window needs at least one sample".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn shared_canvas() -> SharedSurface {
    Rc::new(RefCell::new(Canvas::new().with_call_log(false)))
}




// ============================================================================
fn offline(opts: OfflineOpts) -> Result<(), Box<dyn Error>> {
    let store = Rc::new(TimeSeries::load(&opts.series)?);
    let count = store.count();
    let index = FrameIndex::new(count)?;
    let window = opts.window;

    let s = store.clone();
    let field = Derived::try_map(index.cell(), "field", move |&i: &usize| s.snapshot_at(i))?;

    let s = store.clone();
    let style = Derived::try_map(index.cell(), "style", move |&i: &usize| {
        let half_width = window_color_range(&*s, i, window)?;
        Ok(Style {
            title: Some(format!("t = {:.4}", s.time_at(i)?)),
            ..Style::symmetric(half_width)
        })
    })?;

    let label = Derived::map(index.cell(), "label", move |i: &usize| format!("frame {} / {}", i, count));

    let surface = shared_canvas();
    let _heatmap = PlotBinding::new("heatmap", &surface, PrimitiveKind::Heatmap, field.cell(), Some(style.cell()));
    let _label = PlotBinding::new("label", &surface, PrimitiveKind::Label, label.cell(), None);

    let frames = opts.first.unwrap_or(1)..=opts.last.unwrap_or(count);
    let mut driver = AnimationDriver::new(&surface)
        .with_sink(FrameFile::create(&opts.output)?)
        .with_stop_signal(stop_on_interrupt()?);

    let report = driver.start(Mode::Offline { index: &index, frames })?;

    for (i, e) in &report.rendering_errors {
        warn!("frame {} was rendered with an error: {}", i, e);
    }
    Ok(())
}




// ============================================================================
fn live(opts: LiveOpts) -> Result<(), Box<dyn Error>> {
    let mut sim = Advection1d::new(opts.cells, 1.0, opts.cfl)?;
    let source = Observable::named("tick", Tick::of(&sim));

    let profile = Derived::map(&source, "profile", |t: &Tick| t.snapshot.values().to_vec());
    let title = Derived::map(&source, "title", |t: &Tick| format!("[{}] t = {:.4}", t.iteration, t.time));
    let limits = Style {
        x_limits: Some((0.0, 1.0)),
        y_limits: Some((-0.1, 1.1)),
        ..Style::titled("advected pulse")
    };
    let style = Observable::named("style", limits);

    let surface = shared_canvas();
    let _line = PlotBinding::new("profile", &surface, PrimitiveKind::Line, profile.cell(), Some(style.view()));
    let _label = PlotBinding::new("title", &surface, PrimitiveKind::Label, title.cell(), None);

    let mut driver = AnimationDriver::new(&surface)
        .with_sink(FrameFile::create(&opts.output)?)
        .with_stop_signal(stop_on_interrupt()?);

    driver.start(Mode::Live {
        stepper: &mut sim,
        source: &source,
        ticks: opts.ticks,
        steps_per_tick: opts.steps_per_tick,
    })?;
    Ok(())
}




// ============================================================================
fn synth(opts: SynthOpts) -> Result<(), Box<dyn Error>> {
    let n = opts.resolution;
    let dx = 1.0 / n as f64;

    let frames = (0..opts.frames)
        .map(|k| {
            let time = k as f64 / opts.frames.max(1) as f64;
            let phase = 2.0 * std::f64::consts::PI * time;
            let (cx, cy) = (0.5 + 0.25 * phase.cos(), 0.5 + 0.25 * phase.sin());
            let amplitude = 1.0 + time;

            let snapshot = Snapshot::from_function((n, n), |i, j| {
                let x = (j as f64 + 0.5) * dx;
                let y = (i as f64 + 0.5) * dx;
                amplitude * phase.cos() * f64::exp(-1e2 * ((x - cx).powi(2) + (y - cy).powi(2)))
            });
            (time, snapshot)
        })
        .collect();

    TimeSeries::new(frames)?.save(&opts.output)?;
    Ok(())
}




// ============================================================================
fn main() -> Result<(), Box<dyn Error>> {
    let opts = Opts::parse();

    let level: LevelFilter = opts
        .log_level
        .parse()
        .map_err(|_| format!("unknown log level '{}'", opts.log_level))?;
    SimpleLogger::new().with_level(level).init()?;
    info!("{:?}", opts);

    match opts.command {
        Command::Offline(o) => offline(o),
        Command::Live(o) => live(o),
        Command::Synth(o) => synth(o),
    }
}
