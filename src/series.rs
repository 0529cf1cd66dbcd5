use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Number of samples in the moving window used to pick a color range.
pub const DEFAULT_COLOR_WINDOW: usize = 30;




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * A 2D scalar field sampled at one instant, stored row-major.
 */
pub struct Snapshot {
    shape: (usize, usize),
    values: Vec<f64>,
}




// ============================================================================
impl Snapshot {

    pub fn new(shape: (usize, usize), values: Vec<f64>) -> Result<Self> {
        if shape.0 * shape.1 != values.len() {
            return Err(Error::Decode(format!(
                "snapshot of shape {:?} needs {} values, got {}",
                shape,
                shape.0 * shape.1,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Generate a snapshot with values defined from a closure of the (row,
    /// column) index.
    pub fn from_function<F>(shape: (usize, usize), f: F) -> Self
    where
        F: Fn(usize, usize) -> f64,
    {
        let values = (0..shape.0)
            .flat_map(|i| (0..shape.1).map(move |j| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        Self { shape, values }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |a: f64, b| a.max(b.abs()))
    }
}




/**
 * Read access to a precomputed sequence of snapshots, addressed by a 1-based
 * frame index.
 */
pub trait TimeSeriesStore {

    /// Return the number of samples, N.
    fn count(&self) -> usize;

    /// Return the simulation time of the sample at `index` in `1..=N`.
    fn time_at(&self, index: usize) -> Result<f64>;

    /// Return the snapshot at `index` in `1..=N`. Implementations may do
    /// I/O here.
    fn snapshot_at(&self, index: usize) -> Result<Snapshot>;
}




#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesFormat {
    Cbor,
    MessagePack,
}

impl SeriesFormat {

    /// Pick a format from a file extension: `.cbor`, or `.msgpack`/`.mpk`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("cbor") => Ok(SeriesFormat::Cbor),
            Some("msgpack") | Some("mpk") => Ok(SeriesFormat::MessagePack),
            _ => Err(Error::Decode(format!("unrecognized series file extension: {}", path.display()))),
        }
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * An in-memory time series: ordered (time, snapshot) pairs, read-only after
 * creation. Series are loaded once, in full, from a CBOR or MessagePack
 * file.
 */
pub struct TimeSeries {
    frames: Vec<(f64, Snapshot)>,
}




// ============================================================================
impl TimeSeries {

    pub fn new(frames: Vec<(f64, Snapshot)>) -> Result<Self> {
        if frames.is_empty() {
            Err(Error::EmptySeries)
        } else {
            Ok(Self { frames })
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);

        let series: Self = match SeriesFormat::from_path(path)? {
            SeriesFormat::Cbor => {
                ciborium::de::from_reader(reader).map_err(|e| Error::Decode(format!("{:?}", e)))?
            }
            SeriesFormat::MessagePack => {
                rmp_serde::decode::from_read(reader).map_err(|e| Error::Decode(e.to_string()))?
            }
        };

        if series.frames.is_empty() {
            return Err(Error::EmptySeries);
        }
        info!("loaded {} frames from {}", series.frames.len(), path.display());
        Ok(series)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let format = SeriesFormat::from_path(path)?;
        let mut writer = BufWriter::new(File::create(path)?);

        match format {
            SeriesFormat::Cbor => {
                ciborium::ser::into_writer(self, &mut writer).map_err(|e| Error::Encode(format!("{:?}", e)))?
            }
            SeriesFormat::MessagePack => {
                rmp_serde::encode::write(&mut writer, self).map_err(|e| Error::Encode(e.to_string()))?
            }
        }
        writer.flush()?;
        info!("wrote {} frames to {}", self.frames.len(), path.display());
        Ok(())
    }

    fn frame(&self, index: usize) -> Result<&(f64, Snapshot)> {
        index
            .checked_sub(1)
            .and_then(|i| self.frames.get(i))
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.frames.len(),
            })
    }
}

impl TimeSeriesStore for TimeSeries {
    fn count(&self) -> usize {
        self.frames.len()
    }

    fn time_at(&self, index: usize) -> Result<f64> {
        Ok(self.frame(index)?.0)
    }

    fn snapshot_at(&self, index: usize) -> Result<Snapshot> {
        Ok(self.frame(index)?.1.clone())
    }
}




/**
 * Half the largest absolute value over a moving window of samples, for use
 * as a symmetric color range. The window holds the `window` samples starting
 * at `index`; when fewer than that remain after `index` (that is, for
 * `index > N - window`) it degenerates to the single sample at `index`.
 */
pub fn window_color_range<S: TimeSeriesStore + ?Sized>(store: &S, index: usize, window: usize) -> Result<f64> {
    let count = store.count();

    if index == 0 || index > count {
        return Err(Error::IndexOutOfRange { index, count });
    }
    let last = if window > 0 && index + window <= count {
        index + window - 1
    } else {
        index
    };

    let samples = (index..=last)
        .map(|i| store.snapshot_at(i))
        .collect::<Result<Vec<_>>>()?;

    let max = samples
        .par_iter()
        .map(Snapshot::max_abs)
        .reduce(|| 0.0, f64::max);

    Ok(max / 2.0)
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::path::Path;
    use crate::error::Error;
    use super::{window_color_range, SeriesFormat, Snapshot, TimeSeries, TimeSeriesStore};

    /// A series of `n` 2x2 snapshots whose largest magnitude at frame `i` is
    /// `peak(i)`, with alternating signs.
    fn synthetic<F: Fn(usize) -> f64>(n: usize, peak: F) -> TimeSeries {
        let frames = (1..=n)
            .map(|i| {
                let p = peak(i);
                let sign = if i % 2 == 0 { -1.0 } else { 1.0 };
                let snapshot = Snapshot::new((2, 2), vec![0.0, 0.25 * p, sign * p, -0.5 * p]).unwrap();
                (i as f64 * 0.1, snapshot)
            })
            .collect();
        TimeSeries::new(frames).unwrap()
    }

    #[test]
    fn snapshot_rejects_wrong_number_of_values() {
        assert!(Snapshot::new((2, 3), vec![0.0; 5]).is_err());
        assert_eq!(Snapshot::from_function((2, 3), |i, j| (i * 3 + j) as f64).values()[5], 5.0);
    }

    #[test]
    fn max_abs_sees_negative_values() {
        let s = Snapshot::new((1, 3), vec![1.0, -7.5, 3.0]).unwrap();
        assert_eq!(s.max_abs(), 7.5);
    }

    #[test]
    fn store_is_one_based() {
        let series = synthetic(3, |i| i as f64);
        assert_eq!(series.count(), 3);
        assert_eq!(series.snapshot_at(1).unwrap().max_abs(), 1.0);
        assert_eq!(series.time_at(3).unwrap(), 0.30000000000000004);
        assert!(matches!(series.snapshot_at(0), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(series.snapshot_at(4), Err(Error::IndexOutOfRange { .. })));
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(TimeSeries::new(vec![]), Err(Error::EmptySeries)));
    }

    #[test]
    fn color_range_uses_the_full_window_away_from_the_end() {
        // N = 40; peaks rise to 100 at frame 25 and are 1 elsewhere.
        let series = synthetic(40, |i| if i == 25 { 100.0 } else { 1.0 });

        // Window 1..=30 contains frame 25.
        assert_eq!(window_color_range(&series, 1, 30).unwrap(), 50.0);
        // Window 10..=39 contains frame 25; index 10 = N - 30 is the last full window.
        assert_eq!(window_color_range(&series, 10, 30).unwrap(), 50.0);
        // Window 26..=55 would overrun N, so it is just frame 26.
        assert_eq!(window_color_range(&series, 26, 30).unwrap(), 0.5);
    }

    #[test]
    fn color_range_degenerates_to_one_sample_near_the_end() {
        // Peak at frame i is i, so a full window starting at i would report i + 29.
        let series = synthetic(40, |i| i as f64);

        assert_eq!(window_color_range(&series, 5, 30).unwrap(), 34.0 / 2.0);
        assert_eq!(window_color_range(&series, 10, 30).unwrap(), 39.0 / 2.0);
        for i in 11..=40 {
            assert_eq!(window_color_range(&series, i, 30).unwrap(), i as f64 / 2.0);
        }
        assert!(window_color_range(&series, 41, 30).is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SeriesFormat::from_path(Path::new("run.cbor")).unwrap(), SeriesFormat::Cbor);
        assert_eq!(SeriesFormat::from_path(Path::new("run.mpk")).unwrap(), SeriesFormat::MessagePack);
        assert!(SeriesFormat::from_path(Path::new("run.h5")).is_err());
    }

    #[test]
    fn series_survives_a_trip_through_each_file_format() {
        let series = synthetic(4, |i| i as f64 * 1.5);
        let dir = std::env::temp_dir();

        for name in &["replot-series-test.cbor", "replot-series-test.msgpack"] {
            let path = dir.join(format!("{}-{}", std::process::id(), name));
            series.save(&path).unwrap();
            let loaded = TimeSeries::load(&path).unwrap();
            std::fs::remove_file(&path).unwrap();
            assert_eq!(loaded, series);
        }
    }
}
