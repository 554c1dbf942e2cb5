//! Drawing boundary: the simulator hands a [`Frame`] to a [`Renderer`] once
//! per tick and never draws itself.

use crate::error::{Result, SimError};
use crate::layout::{Cell, LayoutConfig};
use crate::pixels::{PixelBuffer, Rgb};
use std::io::Write;

const OVERLAY_TEXT: Rgb = Rgb::new(130, 130, 130);

/// Largest canvas the terminal renderer will allocate, in character cells.
const MAX_CANVAS: usize = 1 << 24;

/// How pixels are painted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawOptions {
    /// Draw each pixel as an ellipse inscribed in its cell.
    pub circle: bool,
    /// Show pixel indices and a status line.
    pub overlay: bool,
}

/// Everything a renderer may read for one tick.
pub struct Frame<'a> {
    pub pixels: &'a PixelBuffer,
    pub layout: &'a LayoutConfig,
    pub options: DrawOptions,
    /// This tick carried DDP pixel data.
    pub receiving: bool,
    /// Overlay status text.
    pub status: &'a str,
}

pub trait Renderer {
    fn draw(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// Draws nothing. Used when only ingestion, timing and reports matter.
#[derive(Debug, Default)]
pub struct HeadlessRenderer;

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, _frame: &Frame<'_>) -> Result<()> {
        Ok(())
    }
}

/// Cell size and spacing on screen, in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub cell_w: usize,
    pub cell_h: usize,
    pub gutter_x: usize,
    pub gutter_y: usize,
}

impl ScreenGeometry {
    /// Sizes cells so `grid` (width, height) fills `screen` with `gutter`
    /// around and between cells. Cells are at least one unit in each direction.
    pub fn fit(screen: (usize, usize), gutter: (usize, usize), grid: (usize, usize)) -> Self {
        let size = |screen: usize, gutter: usize, cells: usize| {
            let cells = cells.max(1);
            (screen.saturating_sub(cells.saturating_add(1).saturating_mul(gutter)) / cells).max(1)
        };
        Self {
            cell_w: size(screen.0, gutter.0, grid.0),
            cell_h: size(screen.1, gutter.1, grid.1),
            gutter_x: gutter.0,
            gutter_y: gutter.1,
        }
    }

    /// Top-left screen position of `cell`.
    pub fn origin(&self, cell: Cell) -> (usize, usize) {
        (
            span(self.gutter_x, self.cell_w, cell.x),
            span(self.gutter_y, self.cell_h, cell.y),
        )
    }

    /// Screen area covered by `grid`, including the trailing gutter.
    pub fn extent(&self, grid: (usize, usize)) -> (usize, usize) {
        (
            span(self.gutter_x, self.cell_w, grid.0),
            span(self.gutter_y, self.cell_h, grid.1),
        )
    }

    /// Whether offset (`dx`, `dy`) inside a cell falls in the inscribed ellipse.
    fn in_ellipse(&self, dx: usize, dy: usize) -> bool {
        let nx = (dx as f64 + 0.5) / self.cell_w as f64 * 2.0 - 1.0;
        let ny = (dy as f64 + 0.5) / self.cell_h as f64 * 2.0 - 1.0;
        nx * nx + ny * ny <= 1.0
    }
}

/// Offset of the `n`th cell along one axis, saturating on absurd sizes.
fn span(gutter: usize, cell: usize, n: usize) -> usize {
    gutter.saturating_add(gutter.saturating_add(cell).saturating_mul(n))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    fg: Option<Rgb>,
    bg: Option<Rgb>,
}

impl Glyph {
    const EMPTY: Glyph = Glyph {
        ch: ' ',
        fg: None,
        bg: None,
    };
}

/// Paints frames as ANSI true-colour text, one character cell per screen unit.
pub struct TerminalRenderer<W: Write> {
    out: W,
    screen: (usize, usize),
    gutter: (usize, usize),
    canvas: Vec<Glyph>,
    first_frame: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, screen: (usize, usize), gutter: (usize, usize)) -> Self {
        Self {
            out,
            screen,
            gutter,
            canvas: Vec::new(),
            first_frame: true,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn paint(&mut self, frame: &Frame<'_>, geometry: &ScreenGeometry, width: usize) {
        for (index, cell) in frame.layout.cells() {
            let color = frame.pixels.get(index).unwrap_or(Rgb::BLACK);
            let (sx, sy) = geometry.origin(cell);
            for dy in 0..geometry.cell_h {
                for dx in 0..geometry.cell_w {
                    if frame.options.circle && !geometry.in_ellipse(dx, dy) {
                        continue;
                    }
                    self.canvas[(sy + dy) * width + sx + dx].bg = Some(color);
                }
            }
            if frame.options.overlay {
                let label = index.to_string();
                let row = sy * width;
                for (dx, ch) in label.chars().take(geometry.cell_w).enumerate() {
                    let glyph = &mut self.canvas[row + sx + dx];
                    glyph.ch = ch;
                    glyph.fg = Some(OVERLAY_TEXT);
                }
            }
        }

        if frame.options.overlay {
            let status = if frame.receiving {
                format!("DDP {}", frame.status)
            } else {
                format!("    {}", frame.status)
            };
            for (x, ch) in status.chars().take(width).enumerate() {
                self.canvas[x] = Glyph {
                    ch,
                    fg: Some(OVERLAY_TEXT),
                    bg: None,
                };
            }
        }
    }

    fn flush_canvas(&mut self, width: usize) -> std::io::Result<()> {
        let mut text = String::with_capacity(self.canvas.len() * 4);
        if self.first_frame {
            text.push_str("\x1b[2J");
            self.first_frame = false;
        }
        text.push_str("\x1b[H");

        for line in self.canvas.chunks(width) {
            let mut current = (None, None);
            for glyph in line {
                if (glyph.fg, glyph.bg) != current {
                    text.push_str("\x1b[0m");
                    if let Some(fg) = glyph.fg {
                        text.push_str(&format!("\x1b[38;2;{};{};{}m", fg.r, fg.g, fg.b));
                    }
                    if let Some(bg) = glyph.bg {
                        text.push_str(&format!("\x1b[48;2;{};{};{}m", bg.r, bg.g, bg.b));
                    }
                    current = (glyph.fg, glyph.bg);
                }
                text.push(glyph.ch);
            }
            text.push_str("\x1b[0m\n");
        }

        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        let grid = frame.layout.grid_extent();
        let geometry = ScreenGeometry::fit(self.screen, self.gutter, grid);
        let (width, height) = geometry.extent(grid);
        let area = width
            .checked_mul(height)
            .filter(|&area| area <= MAX_CANVAS)
            .ok_or_else(|| {
                SimError::Render(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("screen of {width}x{height} cells is too large"),
                ))
            })?;

        self.canvas.clear();
        self.canvas.resize(area, Glyph::EMPTY);
        self.paint(frame, &geometry, width);
        self.flush_canvas(width).map_err(SimError::Render)
    }
}
