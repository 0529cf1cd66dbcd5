use std::ops::RangeInclusive;
use crate::cell::{Observable, ReadCell};
use crate::error::{Error, Result};




/**
 * The current frame within a time series of `count` samples. The index is
 * 1-based and always lies in `1..=count`; every assignment is validated, so
 * a slider and a plain frame counter go through the same check. An
 * out-of-range assignment fails with `Error::IndexOutOfRange` and leaves the
 * index, and everything derived from it, untouched.
 */
pub struct FrameIndex {
    cell: Observable<usize>,
    count: usize,
}




// ============================================================================
impl FrameIndex {

    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::EmptySeries);
        }
        Ok(Self {
            cell: Observable::named("frame index", 1),
            count,
        })
    }

    pub fn get(&self) -> usize {
        self.cell.get()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        1..=self.count
    }

    /**
     * A read-only view of the underlying cell, for deriving cells from the
     * frame index. Writes only go through [`FrameIndex::set`], so the value
     * is always in range:
     *
     * ```compile_fail
     * let index = replot::index::FrameIndex::new(10).unwrap();
     * index.cell().set(99).unwrap();
     * ```
     */
    pub fn cell(&self) -> &ReadCell<usize> {
        self.cell.view()
    }

    pub fn validate(&self, index: usize) -> Result<usize> {
        if self.range().contains(&index) {
            Ok(index)
        } else {
            Err(Error::IndexOutOfRange {
                index,
                count: self.count,
            })
        }
    }

    pub fn set(&self, index: usize) -> Result<()> {
        self.cell.set(self.validate(index)?)
    }

    /// Move one frame forward. Fails at the last frame rather than wrapping.
    pub fn step_forward(&self) -> Result<()> {
        self.set(self.get() + 1)
    }

    /// Move one frame back. Fails at the first frame rather than wrapping.
    pub fn step_back(&self) -> Result<()> {
        match self.get() {
            1 => Err(Error::IndexOutOfRange { index: 0, count: self.count }),
            i => self.set(i - 1),
        }
    }
}
