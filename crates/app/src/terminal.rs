use std::io::{self, Write};

use crossterm::{
    cursor::MoveUp,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use glowbit_core::{Frame, RenderSink, Result, DISPLAY_SIZE};

/// Prints frames as true-colour block characters, redrawing in place.
pub struct TerminalSink<W: Write> {
    out: W,
    drawn: bool,
    in_place: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(in_place: bool) -> Self {
        Self::new(io::stdout(), in_place)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, in_place: bool) -> Self {
        Self {
            out,
            drawn: false,
            in_place,
        }
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        if self.drawn && self.in_place {
            // back over the previous frame and its title line
            queue!(self.out, MoveUp(DISPLAY_SIZE as u16 + 1))?;
        }
        queue!(
            self.out,
            Clear(ClearType::CurrentLine),
            Print(format!("[{}]\n", frame.surface))
        )?;
        for row in &frame.cells {
            for cell in row {
                let color = Color::Rgb {
                    r: cell.r,
                    g: cell.g,
                    b: cell.b,
                };
                queue!(self.out, SetForegroundColor(color), Print("██"))?;
            }
            queue!(self.out, ResetColor, Print("\n"))?;
        }
        self.out.flush()?;
        self.drawn = true;
        Ok(())
    }
}
