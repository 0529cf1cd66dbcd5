use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;
use log::warn;
use crate::cell::{Observable, ReadCell, Subscriber};
use crate::error::{Error, Result};




/// The subscription a derived cell holds on its upstream cell. On every
/// upstream change it recomputes and stores the result, which in turn runs
/// the derived cell's own cascade.
struct Link<A, B, F> {
    target: Observable<B>,
    f: F,
    _upstream: PhantomData<fn(&A)>,
}

impl<A, B, F> Subscriber<A> for Link<A, B, F>
where
    B: 'static,
    F: Fn(&A) -> Result<B>,
{
    fn on_change(&self, value: &A) -> Result<()> {
        match (self.f)(value) {
            Ok(b) => self.target.set(b),
            Err(e) => {
                warn!("cell '{}' keeps its last value: {}", self.target.label(), e);
                Err(Error::Recompute {
                    cell: self.target.label().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}




/**
 * A cell whose value is always `f(upstream)`. The initial value is computed
 * when the cell is constructed, and every upstream `set` recomputes it
 * eagerly before the upstream cascade moves on to the next subscriber. After
 * any upstream update returns, every transitively derived cell holds the
 * value it would have if computed from scratch.
 *
 * The derived cell owns its subscription: dropping it detaches it from the
 * upstream cell.
 */
pub struct Derived<T> {
    cell: Observable<T>,
    _link: Rc<dyn Any>,
}




// ============================================================================
impl<T: 'static> Derived<T> {

    /// Derive a cell through an infallible function.
    pub fn map<A, F>(upstream: &ReadCell<A>, label: &str, f: F) -> Self
    where
        A: 'static,
        F: Fn(&A) -> T + 'static,
    {
        let initial = upstream.with(&f);
        Self::attach(upstream, Observable::named(label, initial), move |a: &A| Ok(f(a)))
    }

    /**
     * Derive a cell through a fallible function, e.g. one that loads a
     * snapshot from storage. Construction fails if the initial computation
     * fails. A later failure leaves the cell at its last good value, skips
     * its own cascade, and is reported to the upstream `set` as
     * `Error::Recompute`.
     */
    pub fn try_map<A, F>(upstream: &ReadCell<A>, label: &str, f: F) -> Result<Self>
    where
        A: 'static,
        F: Fn(&A) -> Result<T> + 'static,
    {
        let initial = upstream.with(&f).map_err(|e| Error::Recompute {
            cell: label.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::attach(upstream, Observable::named(label, initial), f))
    }

    fn attach<A, F>(upstream: &ReadCell<A>, cell: Observable<T>, f: F) -> Self
    where
        A: 'static,
        F: Fn(&A) -> Result<T> + 'static,
    {
        let link = Rc::new(Link {
            target: cell.clone(),
            f,
            _upstream: PhantomData,
        });
        upstream.subscribe(&link);
        Self { cell, _link: link }
    }

    /// A read-only view of the cell holding the derived value, for chaining
    /// further derived cells or bindings onto it. Only the upstream cascade
    /// writes to the cell.
    pub fn cell(&self) -> &ReadCell<T> {
        self.cell.view()
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.get()
    }

    pub fn with<R, G: FnOnce(&T) -> R>(&self, g: G) -> R {
        self.cell.with(g)
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::cell::RefCell;
    use std::rc::Rc;
    use crate::cell::Observable;
    use crate::error::Error;
    use super::Derived;

    #[test]
    fn derived_value_is_computed_at_construction() {
        let source = Observable::new(3);
        let doubled = Derived::map(&source, "doubled", |x: &i32| x * 2);
        assert_eq!(doubled.get(), 6);
    }

    #[test]
    fn chained_cells_match_fresh_recomputation() {
        let f = |x: &i64| x * 3 + 1;
        let g = |y: &i64| y * y - 7;
        let h = |z: &i64| format!("z={}", z);

        let source = Observable::new(0_i64);
        let a = Derived::map(&source, "a", f);
        let b = Derived::map(a.cell(), "b", g);
        let c = Derived::map(b.cell(), "c", h);

        for value in &[5, -2, 11, 11, 0, 1234, -99] {
            source.set(*value).unwrap();
            assert_eq!(a.get(), f(value));
            assert_eq!(b.get(), g(&f(value)));
            assert_eq!(c.get(), h(&g(&f(value))));
        }
    }

    #[test]
    fn cascade_is_depth_first() {
        let source = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let left = Derived::map(&source, "left", |x: &i32| x + 1);
        let o = order.clone();
        let _left_sub = left.cell().observe(move |v| {
            o.borrow_mut().push(format!("left {}", v));
            Ok(())
        });
        let o = order.clone();
        let _direct = source.observe(move |v| {
            o.borrow_mut().push(format!("source {}", v));
            Ok(())
        });

        source.set(10).unwrap();
        assert_eq!(*order.borrow(), vec!["left 11", "source 10"]);
    }

    #[test]
    fn failed_recompute_keeps_last_good_value() {
        let source = Observable::new(1_usize);
        let checked = Derived::try_map(&source, "checked", |x: &usize| {
            if *x < 10 {
                Ok(x * 100)
            } else {
                Err(Error::IndexOutOfRange { index: *x, count: 9 })
            }
        })
        .unwrap();

        let downstream_runs = Rc::new(RefCell::new(0));
        let d = downstream_runs.clone();
        let _sub = checked.cell().observe(move |_| {
            *d.borrow_mut() += 1;
            Ok(())
        });

        source.set(4).unwrap();
        assert_eq!(checked.get(), 400);

        match source.set(12) {
            Err(Error::Recompute { cell, .. }) => assert_eq!(cell, "checked"),
            other => panic!("expected recompute error, got {:?}", other),
        }
        assert_eq!(checked.get(), 400);
        assert_eq!(*downstream_runs.borrow(), 1);
    }

    #[test]
    fn failed_initial_computation_fails_construction() {
        let source = Observable::new(0);
        let result = Derived::try_map(&source, "bad", |_: &i32| -> crate::error::Result<i32> { Err(Error::EmptySeries) });
        assert!(result.is_err());
    }

    #[test]
    fn dropping_a_derived_cell_detaches_it() {
        let source = Observable::new(0);
        let derived = Derived::map(&source, "d", |x: &i32| *x);
        assert_eq!(source.subscriber_count(), 1);
        drop(derived);
        assert_eq!(source.subscriber_count(), 0);
    }
}
