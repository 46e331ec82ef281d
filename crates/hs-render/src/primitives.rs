use crate::color::{BLACK, Color};

/// Fill + stroke style for rectangles and polygons.
#[derive(Debug, Clone)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { fill: None, stroke: None, stroke_width: 1.0 }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self { fill: Some(color), ..Default::default() }
    }

    pub fn stroked(color: Color, width: f64) -> Self {
        Self { stroke: Some(color), stroke_width: width, ..Default::default() }
    }

    /// Filled area with an outline, like a ROOT histogram with fill and line color.
    pub fn filled_outlined(fill: Color, stroke: Color, width: f64) -> Self {
        Self { fill: Some(fill), stroke: Some(stroke), stroke_width: width }
    }
}

#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    pub dash: Option<String>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self { color: BLACK, width: 1.0, dash: None }
    }
}

impl LineStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: None }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self { color, width, dash: Some("6 3".into()) }
    }
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub size: f64,
    pub color: Color,
    pub weight: FontWeight,
    pub style: FontStyle,
    pub anchor: TextAnchor,
    pub baseline: TextBaseline,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 10.0,
            color: BLACK,
            weight: FontWeight::Regular,
            style: FontStyle::Normal,
            anchor: TextAnchor::Start,
            baseline: TextBaseline::Alphabetic,
        }
    }
}

impl TextStyle {
    pub fn sized(size: f64) -> Self {
        Self { size, ..Default::default() }
    }

    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style = FontStyle::Italic;
        self
    }

    pub fn anchor(mut self, anchor: TextAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn baseline(mut self, baseline: TextBaseline) -> Self {
        self.baseline = baseline;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_str(&self) -> &str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Alphabetic,
    Central,
    Hanging,
}

impl TextBaseline {
    pub fn as_str(&self) -> &str {
        match self {
            TextBaseline::Alphabetic => "auto",
            TextBaseline::Central => "central",
            TextBaseline::Hanging => "hanging",
        }
    }
}

/// Marker style for data points.
#[derive(Debug, Clone)]
pub struct MarkerStyle {
    pub shape: MarkerShape,
    /// Radius (circle) or half-side (square) in points.
    pub size: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    Square,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self { shape: MarkerShape::Circle, size: 3.0, color: BLACK }
    }
}
