//! Text layout: raw text to styled, width-wrapped rows of cells.
//!
//! Layout runs in three steps:
//! 1. [`parse_styles`]: text to cells, honouring inline markers of the form
//!    `[text](fg:green,mod:bold)`
//! 2. [`wrap_cells`]: insert line breaks so no row is wider than the given
//!    width, breaking between words and splitting words only when a single
//!    word is wider than a row
//! 3. [`split_rows`]: cut the cell stream into rows at every newline
//!
//! [`layout`] is a pure function of its arguments, so a scroll offset into its
//! output stays meaningful when the same text is laid out again.

use itertools::Itertools;
use once_cell::sync::Lazy;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use unicode_width::UnicodeWidthChar;

/// One character and its style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayCell {
    pub ch: char,
    pub style: Style,
}

impl DisplayCell {
    pub const fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }

    /// Columns this cell occupies.
    pub fn width(&self) -> usize {
        self.ch.width().unwrap_or(0)
    }
}

pub type Row = Vec<DisplayCell>;

static STYLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\[\]]+)\]\(([^()]+)\)").expect("style marker pattern is valid")
});

fn parse_color(name: &str) -> Option<Color> {
    let color = match name {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        "clear" => Color::Reset,
        _ => return None,
    };
    Some(color)
}

fn parse_modifier(name: &str) -> Option<Modifier> {
    let modifier = match name {
        "bold" => Modifier::BOLD,
        "dim" => Modifier::DIM,
        "italic" => Modifier::ITALIC,
        "underline" => Modifier::UNDERLINED,
        "reverse" => Modifier::REVERSED,
        _ => return None,
    };
    Some(modifier)
}

/// Parse a marker's style list, e.g. `fg:green,mod:bold|underline`.
///
/// Returns `None` if any entry is unknown, so the marker is kept as text.
pub fn parse_style_spec(spec: &str) -> Option<Style> {
    let mut style = Style::default();
    for entry in spec.split(',') {
        let (key, value) = entry.split_once(':')?;
        let value = value.trim();
        style = match key.trim() {
            "fg" => style.fg(parse_color(value)?),
            "bg" => style.bg(parse_color(value)?),
            "mod" | "modifier" => value
                .split('|')
                .try_fold(style, |s, m| parse_modifier(m.trim()).map(|m| s.add_modifier(m)))?,
            _ => return None,
        };
    }
    Some(style)
}

fn push_text(cells: &mut Vec<DisplayCell>, text: &str, style: Style) {
    for ch in text.chars() {
        match ch {
            '\n' => cells.push(DisplayCell::new('\n', style)),
            '\t' => cells.push(DisplayCell::new(' ', style)),
            c if c.is_control() => {}
            c => cells.push(DisplayCell::new(c, style)),
        }
    }
}

/// Convert text to cells in `base` style, applying inline style markers.
///
/// A marker is `[text](key:value,...)` with keys `fg`, `bg` (color names)
/// and `mod` (`bold`, `dim`, `italic`, `underline`, `reverse`, joined by `|`).
/// Marker styles are patched over `base`. Markers with unknown keys or values
/// are kept verbatim. Tabs become spaces and other control characters except
/// `\n` are dropped.
///
/// # Arguments
///
/// * `text` - Raw text, possibly containing markers
/// * `base` - Style for every cell not inside a marker
///
/// # Returns
///
/// One cell per displayed character, newlines included.
///
/// # Examples
///
/// ```ignore
/// let cells = parse_styles("[Date:](fg:green)2025-06-01", Style::default());
/// assert_eq!(cells[0].style.fg, Some(Color::Green));
/// assert_eq!(cells.len(), "Date:2025-06-01".len());
/// ```
pub fn parse_styles(text: &str, base: Style) -> Vec<DisplayCell> {
    let mut cells = Vec::with_capacity(text.len());
    let mut last = 0;
    for caps in STYLE_MARKER.captures_iter(text) {
        let (Some(whole), Some(inner), Some(spec)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        push_text(&mut cells, &text[last..whole.start()], base);
        match parse_style_spec(spec.as_str()) {
            Some(style) => push_text(&mut cells, inner.as_str(), base.patch(style)),
            None => push_text(&mut cells, whole.as_str(), base),
        }
        last = whole.end();
    }
    push_text(&mut cells, &text[last..], base);
    cells
}

/// The text with style markers removed.
pub fn strip_markup(text: &str) -> String {
    parse_styles(text, Style::default()).iter().map(|c| c.ch).collect()
}

struct Wrapper {
    out: Vec<DisplayCell>,
    width: usize,
    line_width: usize,
    /// The current row was started by a soft break.
    soft_wrapped: bool,
}

impl Wrapper {
    fn push(&mut self, cell: DisplayCell) {
        self.line_width += cell.width();
        self.soft_wrapped = false;
        self.out.push(cell);
    }

    fn soft_break(&mut self, style: Style) {
        while self.out.last().is_some_and(|c| c.ch == ' ') {
            self.out.pop();
        }
        self.out.push(DisplayCell::new('\n', style));
        self.line_width = 0;
        self.soft_wrapped = true;
    }

    fn hard_break(&mut self, cell: DisplayCell) {
        self.out.push(cell);
        self.line_width = 0;
        self.soft_wrapped = false;
    }

    fn space(&mut self, cell: DisplayCell) {
        if self.line_width == 0 && self.soft_wrapped {
            return;
        }
        if self.line_width + 1 > self.width {
            self.soft_break(cell.style);
            return;
        }
        self.push(cell);
    }

    fn word(&mut self, word: &[DisplayCell]) {
        let Some(first) = word.first() else {
            return;
        };
        let word_width: usize = word.iter().map(DisplayCell::width).sum();
        if self.line_width > 0 && self.line_width + word_width > self.width {
            self.soft_break(first.style);
        }
        for &cell in word {
            if self.line_width > 0 && self.line_width + cell.width() > self.width {
                self.soft_break(cell.style);
            }
            self.push(cell);
        }
    }
}

/// Insert newline cells so that no row is wider than `width` columns.
///
/// Breaks go between words where possible; a word wider than a whole row is
/// split across rows. Spaces at a soft break are dropped, existing newlines
/// are kept.
///
/// # Arguments
///
/// * `cells` - Cells from [`parse_styles`]
/// * `width` - Row width in terminal columns; zero disables wrapping
///
/// # Returns
///
/// The same cells with newline cells inserted at the break points.
pub fn wrap_cells(cells: &[DisplayCell], width: usize) -> Vec<DisplayCell> {
    if width == 0 {
        return cells.to_vec();
    }
    let mut wrapper = Wrapper {
        out: Vec::with_capacity(cells.len() + cells.len() / width + 1),
        width,
        line_width: 0,
        soft_wrapped: false,
    };
    let mut word: Vec<DisplayCell> = Vec::new();

    for &cell in cells {
        match cell.ch {
            '\n' => {
                wrapper.word(&word);
                word.clear();
                wrapper.hard_break(cell);
            }
            ' ' => {
                wrapper.word(&word);
                word.clear();
                wrapper.space(cell);
            }
            _ => word.push(cell),
        }
    }
    wrapper.word(&word);
    wrapper.out
}

/// Split cells into rows at newline cells. Always yields at least one row.
pub fn split_rows(cells: &[DisplayCell]) -> Vec<Row> {
    cells
        .split(|c| c.ch == '\n')
        .map(<[DisplayCell]>::to_vec)
        .collect()
}

/// Lay out `text` as rows of cells, wrapped to `width` when `wrap` is set.
///
/// The result depends only on the arguments, so laying out the same text at
/// the same width always yields the same rows.
///
/// # Arguments
///
/// * `text` - Title and body, possibly with style markers
/// * `style` - Base style for unmarked text
/// * `wrap` - Whether to wrap at `width`
/// * `width` - Row width in terminal columns
///
/// # Returns
///
/// The rows to display, at least one.
///
/// # Examples
///
/// ```ignore
/// let rows = layout("hello world again", Style::default(), true, 11);
/// assert_eq!(rows.len(), 2); // "hello world", "again"
/// ```
pub fn layout(text: &str, style: Style, wrap: bool, width: usize) -> Vec<Row> {
    let cells = parse_styles(text, style);
    if wrap {
        split_rows(&wrap_cells(&cells, width))
    } else {
        split_rows(&cells)
    }
}

/// Convert a row into a ratatui line, one span per run of equal style.
pub fn row_to_line(row: &[DisplayCell]) -> Line<'static> {
    let runs = row.iter().chunk_by(|c| c.style);
    let spans: Vec<Span<'static>> = runs
        .into_iter()
        .map(|(style, cells)| Span::styled(cells.map(|c| c.ch).collect::<String>(), style))
        .collect();
    Line::from(spans)
}
