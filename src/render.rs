use std::cell::RefCell;
use std::rc::Rc;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::series::Snapshot;




#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Heatmap,
    Surface,
    Line,
    Label,
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * The data a primitive is drawn from.
 */
pub enum PlotData {
    Grid { shape: (usize, usize), values: Vec<f64> },
    Line(Vec<f64>),
    Text(String),
}

impl PlotData {

    /// The shape a primitive is drawn at. A primitive may only be updated with
    /// data of the same shape as its original draw.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            PlotData::Grid { shape, .. } => *shape,
            PlotData::Line(values) => (values.len(), 1),
            PlotData::Text(_) => (1, 1),
        }
    }
}




/// Anything that can be drawn by a binding.
pub trait Plottable {
    fn to_plot_data(&self) -> PlotData;
}

impl Plottable for PlotData {
    fn to_plot_data(&self) -> PlotData {
        self.clone()
    }
}

impl Plottable for Snapshot {
    fn to_plot_data(&self) -> PlotData {
        PlotData::Grid {
            shape: self.shape(),
            values: self.values().to_vec(),
        }
    }
}

impl Plottable for Vec<f64> {
    fn to_plot_data(&self) -> PlotData {
        PlotData::Line(self.clone())
    }
}

impl Plottable for String {
    fn to_plot_data(&self) -> PlotData {
        PlotData::Text(self.clone())
    }
}




#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub title: Option<String>,
    pub color_range: Option<(f64, f64)>,
    pub x_limits: Option<(f64, f64)>,
    pub y_limits: Option<(f64, f64)>,
}

impl Style {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    /// A color range symmetric about zero, as used for signed fields.
    pub fn symmetric(half_width: f64) -> Self {
        Self {
            color_range: Some((-half_width, half_width)),
            ..Self::default()
        }
    }
}




#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(pub usize);




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * The draw state of one primitive. The revision counts the updates and
 * restyles applied since it was drawn.
 */
pub struct Primitive {
    pub handle: Handle,
    pub kind: PrimitiveKind,
    pub data: PlotData,
    pub style: Style,
    pub revision: u64,
}




#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]

/**
 * Everything currently drawn on a surface, in draw order. This is what gets
 * captured into an output sequence.
 */
pub struct Frame {
    pub primitives: Vec<Primitive>,
}

impl Frame {
    pub fn primitive(&self, handle: Handle) -> Option<&Primitive> {
        self.primitives.iter().find(|p| p.handle == handle)
    }
}




/**
 * A place primitives are drawn. `draw` creates a primitive and returns its
 * handle; `update` swaps in new data, which must have the same shape as the
 * data the primitive was drawn with.
 */
pub trait RenderSurface {
    fn draw(&mut self, kind: PrimitiveKind, data: &PlotData, style: &Style) -> Handle;

    fn update(&mut self, handle: Handle, data: &PlotData) -> Result<()>;

    fn restyle(&mut self, handle: Handle, style: &Style) -> Result<()>;

    /// Return the current draw state of every primitive.
    fn frame(&self) -> Frame;
}

/// Surfaces are shared between the bindings drawing on them and the driver
/// capturing from them.
pub type SharedSurface = Rc<RefCell<dyn RenderSurface>>;




#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Draw(Handle),
    Update(Handle),
    Restyle(Handle),
}




/**
 * An in-memory surface. It keeps the draw state of each primitive and,
 * unless turned off, a log of the calls made on it, which is enough to
 * capture frames and to check what the bindings did. Long runs should turn
 * the log off or clear it now and then; it grows by one entry per call.
 */
pub struct Canvas {
    primitives: Vec<Primitive>,
    calls: Vec<Call>,
    log_calls: bool,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}




// ============================================================================
impl Canvas {

    pub fn new() -> Self {
        Self {
            primitives: Vec::new(),
            calls: Vec::new(),
            log_calls: true,
        }
    }

    /// Turn the call log on or off.
    pub fn with_call_log(mut self, log_calls: bool) -> Self {
        self.log_calls = log_calls;
        self
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear()
    }

    pub fn shared() -> Rc<RefCell<Canvas>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn primitive(&self, handle: Handle) -> Option<&Primitive> {
        self.primitives.get(handle.0)
    }

    fn primitive_mut(&mut self, handle: Handle) -> Result<&mut Primitive> {
        self.primitives.get_mut(handle.0).ok_or(Error::UnknownHandle(handle.0))
    }

    fn record(&mut self, call: Call) {
        if self.log_calls {
            self.calls.push(call)
        }
    }
}

impl RenderSurface for Canvas {
    fn draw(&mut self, kind: PrimitiveKind, data: &PlotData, style: &Style) -> Handle {
        let handle = Handle(self.primitives.len());
        debug!("draw {:?} {:?} with shape {:?}", kind, handle, data.shape());

        self.primitives.push(Primitive {
            handle,
            kind,
            data: data.clone(),
            style: style.clone(),
            revision: 0,
        });
        self.record(Call::Draw(handle));
        handle
    }

    fn update(&mut self, handle: Handle, data: &PlotData) -> Result<()> {
        let primitive = self.primitive_mut(handle)?;
        let expected = primitive.data.shape();

        if data.shape() != expected {
            return Err(Error::ShapeMismatch {
                binding: format!("{:?}", handle),
                cell: String::new(),
                expected,
                found: data.shape(),
            });
        }
        primitive.data = data.clone();
        primitive.revision += 1;
        self.record(Call::Update(handle));
        Ok(())
    }

    fn restyle(&mut self, handle: Handle, style: &Style) -> Result<()> {
        let primitive = self.primitive_mut(handle)?;
        primitive.style = style.clone();
        primitive.revision += 1;
        self.record(Call::Restyle(handle));
        Ok(())
    }

    fn frame(&self) -> Frame {
        Frame {
            primitives: self.primitives.clone(),
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::error::Error;
    use super::{Call, Canvas, PlotData, PrimitiveKind, RenderSurface, Style};

    #[test]
    fn update_requires_the_drawn_shape() {
        let mut canvas = Canvas::new();
        let h = canvas.draw(PrimitiveKind::Line, &PlotData::Line(vec![1.0, 2.0]), &Style::default());

        canvas.update(h, &PlotData::Line(vec![3.0, 4.0])).unwrap();
        assert!(matches!(
            canvas.update(h, &PlotData::Line(vec![1.0])),
            Err(Error::ShapeMismatch { expected: (2, 1), found: (1, 1), .. })
        ));

        let p = canvas.primitive(h).unwrap();
        assert_eq!(p.data, PlotData::Line(vec![3.0, 4.0]));
        assert_eq!(p.revision, 1);
        assert_eq!(canvas.calls(), &[Call::Draw(h), Call::Update(h)]);
    }

    #[test]
    fn call_log_can_be_cleared_or_turned_off() {
        let mut canvas = Canvas::new();
        let h = canvas.draw(PrimitiveKind::Line, &PlotData::Line(vec![0.0]), &Style::default());
        canvas.update(h, &PlotData::Line(vec![1.0])).unwrap();
        assert_eq!(canvas.calls().len(), 2);
        canvas.clear_calls();
        assert!(canvas.calls().is_empty());

        let mut quiet = Canvas::new().with_call_log(false);
        let h = quiet.draw(PrimitiveKind::Line, &PlotData::Line(vec![0.0]), &Style::default());
        for i in 0..100 {
            quiet.update(h, &PlotData::Line(vec![i as f64])).unwrap();
        }
        assert!(quiet.calls().is_empty());
        assert_eq!(quiet.primitive(h).unwrap().revision, 100);
    }

    #[test]
    fn unknown_handles_are_reported() {
        let mut canvas = Canvas::new();
        let h = canvas.draw(PrimitiveKind::Label, &PlotData::Text("t".into()), &Style::titled("a"));
        let stale = super::Handle(h.0 + 1);
        assert!(matches!(canvas.restyle(stale, &Style::default()), Err(Error::UnknownHandle(1))));
    }

    #[test]
    fn frame_lists_primitives_in_draw_order() {
        let mut canvas = Canvas::new();
        let a = canvas.draw(PrimitiveKind::Heatmap, &PlotData::Grid { shape: (1, 2), values: vec![0.0, 1.0] }, &Style::symmetric(1.0));
        let b = canvas.draw(PrimitiveKind::Label, &PlotData::Text("t = 0".into()), &Style::default());
        let frame = canvas.frame();
        assert_eq!(frame.primitives.len(), 2);
        assert_eq!(frame.primitives[0].handle, a);
        assert_eq!(frame.primitive(b).unwrap().kind, PrimitiveKind::Label);
        assert_eq!(frame.primitive(a).unwrap().style.color_range, Some((-1.0, 1.0)));
    }
}
