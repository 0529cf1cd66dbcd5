use std::cell::Cell;
use std::rc::Rc;
use log::warn;
use crate::cell::{ReadCell, Subscriber};
use crate::error::{Error, Result};
use crate::render::{Handle, PrimitiveKind, Plottable, SharedSurface, Style};




struct BindingState {
    name: String,
    handle: Handle,
    surface: SharedSurface,
    errors: Cell<usize>,
}

impl BindingState {
    fn failed(&self, error: Error) -> Error {
        self.errors.set(self.errors.get() + 1);
        warn!("binding '{}': {}", self.name, error);
        error
    }
}




struct DataLink {
    state: Rc<BindingState>,
    cell: String,
}

impl<T: Plottable> Subscriber<T> for DataLink {
    fn on_change(&self, value: &T) -> Result<()> {
        let state = &self.state;
        let data = value.to_plot_data();
        let result = state.surface.borrow_mut().update(state.handle, &data);

        result.map_err(|e| match e {
            Error::ShapeMismatch { expected, found, .. } => state.failed(Error::ShapeMismatch {
                binding: state.name.clone(),
                cell: self.cell.clone(),
                expected,
                found,
            }),
            other => state.failed(other),
        })
    }
}




struct StyleLink {
    state: Rc<BindingState>,
}

impl Subscriber<Style> for StyleLink {
    fn on_change(&self, style: &Style) -> Result<()> {
        let state = &self.state;
        let result = state.surface.borrow_mut().restyle(state.handle, style);
        result.map_err(|e| state.failed(e))
    }
}




/**
 * A rendering primitive wired to the cells that supply its data and, if
 * given, its style. Constructing the binding draws the primitive from the
 * cells' current values; after that the primitive is redrawn whenever one
 * of those cells changes. There is nothing to call to redraw.
 *
 * When a data cell holds something the primitive cannot draw (a different
 * shape than it was drawn with), the update fails with
 * `Error::ShapeMismatch` naming this binding and the cell. The primitive
 * keeps its last good state and other subscribers of the cell still run.
 *
 * Dropping the binding unsubscribes it; the primitive stays on the surface.
 */
pub struct PlotBinding {
    state: Rc<BindingState>,
    _data: Rc<DataLink>,
    _style: Option<Rc<StyleLink>>,
}




// ============================================================================
impl PlotBinding {

    pub fn new<T>(
        name: &str,
        surface: &SharedSurface,
        kind: PrimitiveKind,
        data: &ReadCell<T>,
        style: Option<&ReadCell<Style>>,
    ) -> Self
    where
        T: Plottable + 'static,
    {
        let initial_data = data.with(T::to_plot_data);
        let initial_style = style.map(ReadCell::get).unwrap_or_default();
        let handle = surface.borrow_mut().draw(kind, &initial_data, &initial_style);

        let state = Rc::new(BindingState {
            name: name.to_string(),
            handle,
            surface: surface.clone(),
            errors: Cell::new(0),
        });

        let data_link = Rc::new(DataLink {
            state: state.clone(),
            cell: data.label().to_string(),
        });
        data.subscribe(&data_link);

        let style_link = style.map(|cell| {
            let link = Rc::new(StyleLink { state: state.clone() });
            cell.subscribe(&link);
            link
        });

        Self {
            state,
            _data: data_link,
            _style: style_link,
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn handle(&self) -> Handle {
        self.state.handle
    }

    /// Return the number of failed redraws since the binding was created.
    pub fn errors(&self) -> usize {
        self.state.errors.get()
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::cell::RefCell;
    use std::rc::Rc;
    use crate::cell::Observable;
    use crate::derived::Derived;
    use crate::error::Error;
    use crate::render::{Call, Canvas, PlotData, PrimitiveKind, SharedSurface, Style};
    use crate::series::Snapshot;
    use super::PlotBinding;

    fn setup() -> (Rc<RefCell<Canvas>>, SharedSurface) {
        let canvas = Canvas::shared();
        let surface: SharedSurface = canvas.clone();
        (canvas, surface)
    }

    #[test]
    fn construction_draws_from_current_values() {
        let (canvas, surface) = setup();
        let data = Observable::new(vec![1.0, 2.0, 3.0]);
        let style = Observable::new(Style::titled("u(x)"));
        let binding = PlotBinding::new("profile", &surface, PrimitiveKind::Line, &data, Some(style.view()));

        let canvas = canvas.borrow();
        let p = canvas.primitive(binding.handle()).unwrap();
        assert_eq!(p.data, PlotData::Line(vec![1.0, 2.0, 3.0]));
        assert_eq!(p.style.title.as_deref(), Some("u(x)"));
        assert_eq!(canvas.calls(), &[Call::Draw(binding.handle())]);
    }

    #[test]
    fn cell_changes_redraw_the_primitive() {
        let (canvas, surface) = setup();
        let frame = Observable::new(1_usize);
        let field = Derived::map(&frame, "field", |&i: &usize| Snapshot::from_function((2, 2), move |r, c| (i * 10 + r * 2 + c) as f64));
        let range = Derived::map(field.cell(), "range", |s: &Snapshot| Style::symmetric(s.max_abs()));
        let binding = PlotBinding::new("heatmap", &surface, PrimitiveKind::Heatmap, field.cell(), Some(range.cell()));

        frame.set(3).unwrap();

        let canvas = canvas.borrow();
        let p = canvas.primitive(binding.handle()).unwrap();
        assert_eq!(p.data, PlotData::Grid { shape: (2, 2), values: vec![30.0, 31.0, 32.0, 33.0] });
        assert_eq!(p.style.color_range, Some((-33.0, 33.0)));
        assert_eq!(p.revision, 2);
    }

    #[test]
    fn shape_mismatch_names_the_binding_and_cell() {
        let (canvas, surface) = setup();
        let data = Observable::named("profile data", vec![0.0; 4]);
        let binding = PlotBinding::new("profile", &surface, PrimitiveKind::Line, &data, None);

        match data.set(vec![0.0; 5]) {
            Err(Error::ShapeMismatch { binding: b, cell, expected, found }) => {
                assert_eq!(b, "profile");
                assert_eq!(cell, "profile data");
                assert_eq!(expected, (4, 1));
                assert_eq!(found, (5, 1));
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
        assert_eq!(binding.errors(), 1);
        assert_eq!(canvas.borrow().primitive(binding.handle()).unwrap().data, PlotData::Line(vec![0.0; 4]));

        data.set(vec![1.0; 4]).unwrap();
        assert_eq!(canvas.borrow().primitive(binding.handle()).unwrap().data, PlotData::Line(vec![1.0; 4]));
    }

    #[test]
    fn a_failing_binding_does_not_block_its_neighbours() {
        let (canvas, surface) = setup();
        let data = Observable::new(vec![0.0; 2]);
        let narrow = PlotBinding::new("narrow", &surface, PrimitiveKind::Line, &data, None);

        let label = Derived::map(&data, "label", |v: &Vec<f64>| format!("{} points", v.len()));
        let title = PlotBinding::new("title", &surface, PrimitiveKind::Label, label.cell(), None);

        let result = data.set(vec![0.0; 3]);
        assert!(result.unwrap_err().is_recoverable());
        assert_eq!(narrow.errors(), 1);
        assert_eq!(title.errors(), 0);
        assert_eq!(
            canvas.borrow().primitive(title.handle()).unwrap().data,
            PlotData::Text("3 points".into())
        );
    }

    #[test]
    fn dropped_binding_stops_redrawing() {
        let (canvas, surface) = setup();
        let data = Observable::new("a".to_string());
        let binding = PlotBinding::new("label", &surface, PrimitiveKind::Label, &data, None);
        let handle = binding.handle();
        assert_eq!(binding.name(), "label");
        drop(binding);

        data.set("b".to_string()).unwrap();
        assert_eq!(canvas.borrow().primitive(handle).unwrap().data, PlotData::Text("a".into()));
    }
}
