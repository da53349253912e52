//! Cues and cue sets

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

static EMPTY_CUES: OnceLock<Arc<[Cue]>> = OnceLock::new();

/// Horizontal alignment of cue text within its box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Start,
    Center,
    End,
}

/// Which edge of the cue box a position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// How a [`CueLine`] value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    /// Fraction of the viewport height, 0.0 at the top
    Fraction,
    /// Line number; negative values count up from the bottom
    Number,
}

/// Vertical placement of a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueLine {
    pub value: f32,
    pub line_type: LineType,
    pub anchor: Anchor,
}

/// Styling hints a sink may honour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Foreground colour as 0xAARRGGBB
    pub color: Option<u32>,
}

/// A single caption fragment. Positioning fields left as `None` use the
/// sink's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub text: String,
    pub alignment: Option<TextAlignment>,
    pub line: Option<CueLine>,
    /// Horizontal position as a fraction of the viewport width
    pub position: Option<f32>,
    pub position_anchor: Option<Anchor>,
    /// Width of the cue box as a fraction of the viewport width
    pub size: Option<f32>,
    pub style: Option<CueStyle>,
}

impl Cue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alignment: None,
            line: None,
            position: None,
            position_anchor: None,
            size: None,
            style: None,
        }
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_line(mut self, value: f32, line_type: LineType, anchor: Anchor) -> Self {
        self.line = Some(CueLine {
            value,
            line_type,
            anchor,
        });
        self
    }

    pub fn with_position(mut self, position: f32, anchor: Anchor) -> Self {
        self.position = Some(position);
        self.position_anchor = Some(anchor);
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_style(mut self, style: CueStyle) -> Self {
        self.style = Some(style);
        self
    }
}

/// An immutable snapshot of the cues visible at one instant.
///
/// Cloning is a reference-count bump, and every empty set shares one
/// allocation, so clearing the sink never allocates.
#[derive(Debug, Clone)]
pub struct CueSet(Arc<[Cue]>);

impl CueSet {
    /// The shared empty cue set
    pub fn empty() -> Self {
        CueSet(EMPTY_CUES.get_or_init(|| Arc::from(Vec::new())).clone())
    }

    pub fn new(cues: Vec<Cue>) -> Self {
        if cues.is_empty() {
            return Self::empty();
        }
        CueSet(Arc::from(cues))
    }

    /// Whether two sets share the same allocation
    pub fn ptr_eq(&self, other: &CueSet) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Cue texts, for logging and assertions
    pub fn texts(&self) -> Vec<&str> {
        self.0.iter().map(|cue| cue.text.as_str()).collect()
    }
}

impl Default for CueSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for CueSet {
    type Target = [Cue];

    fn deref(&self) -> &[Cue] {
        &self.0
    }
}

impl PartialEq for CueSet {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl From<Vec<Cue>> for CueSet {
    fn from(cues: Vec<Cue>) -> Self {
        CueSet::new(cues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sets_share_allocation() {
        let a = CueSet::empty();
        let b = CueSet::new(Vec::new());
        assert!(a.ptr_eq(&b));
        assert!(a.is_empty());
    }

    #[test]
    fn test_structural_equality() {
        let a = CueSet::new(vec![Cue::new("HELLO").with_size(0.5)]);
        let b = CueSet::new(vec![Cue::new("HELLO").with_size(0.5)]);
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, CueSet::new(vec![Cue::new("HELLO")]));
    }

    #[test]
    fn test_cue_builder() {
        let cue = Cue::new("line")
            .with_alignment(TextAlignment::Center)
            .with_line(-1.0, LineType::Number, Anchor::End)
            .with_position(0.5, Anchor::Middle)
            .with_style(CueStyle {
                italic: true,
                ..Default::default()
            });

        assert_eq!(cue.alignment, Some(TextAlignment::Center));
        assert_eq!(cue.line.map(|l| l.line_type), Some(LineType::Number));
        assert_eq!(cue.position_anchor, Some(Anchor::Middle));
        assert!(cue.style.as_ref().is_some_and(|s| s.italic && !s.bold));
    }

    #[test]
    fn test_texts() {
        let set = CueSet::from(vec![Cue::new("A"), Cue::new("B")]);
        assert_eq!(set.texts(), vec!["A", "B"]);
        assert_eq!(set.len(), 2);
    }
}
