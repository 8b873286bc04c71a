//! Terminal output.
//!
//! # Responsibilities
//! - Enter the alternate screen and hide the cursor
//! - Paint frames row by row with absolute cursor positioning
//! - Restore the cursor and screen on every exit path (normal, error, panic)

use crossterm::{
    cursor,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal, ExecutableCommand, QueueableCommand,
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::layout::{Dimensions, Line, LineStyle};

/// Something a frame can be painted on.
pub trait Screen: Send {
    /// Current size; read before every repaint.
    fn size(&self) -> io::Result<Dimensions>;

    /// Paint `lines`, one per row from the top.
    fn draw(&mut self, lines: &[Line]) -> io::Result<()>;

    /// Give the terminal back: cursor visible, original screen restored.
    fn restore(&mut self) -> io::Result<()>;
}

/// The process terminal, via crossterm.
pub struct Terminal<W: Write + Send = io::Stdout> {
    out: W,
    restored: bool,
    /// Set when a panic hook gave the screen back while we kept running.
    screen_lost: Arc<AtomicBool>,
}

impl Terminal<io::Stdout> {
    /// Take over stdout: alternate screen, hidden cursor.
    ///
    /// Also installs a panic hook that shows the cursor again before the
    /// default hook prints the panic. A panic in a connection task does not
    /// end the process, so the next `draw` takes the screen back.
    pub fn stdout() -> io::Result<Self> {
        let terminal = Self::enter(io::stdout())?;
        install_panic_hook(Arc::clone(&terminal.screen_lost));
        Ok(terminal)
    }
}

impl<W: Write + Send> Terminal<W> {
    /// Prepare `out` for painting.
    pub fn enter(mut out: W) -> io::Result<Self> {
        out.execute(terminal::EnterAlternateScreen)?;
        out.execute(cursor::Hide)?;
        out.execute(terminal::Clear(terminal::ClearType::All))?;
        Ok(Self {
            out,
            restored: false,
            screen_lost: Arc::new(AtomicBool::new(false)),
        })
    }

    fn paint_line(&mut self, row: u16, line: &Line) -> io::Result<()> {
        self.out.queue(cursor::MoveTo(0, row))?;
        match line.style {
            LineStyle::Plain => {
                self.out.queue(Print(&line.text))?;
            }
            LineStyle::Header => {
                self.out.queue(SetAttribute(Attribute::Reverse))?;
                self.out.queue(Print(&line.text))?;
                self.out.queue(SetAttribute(Attribute::Reset))?;
            }
            LineStyle::Alert => {
                self.out.queue(SetForegroundColor(Color::Red))?;
                self.out.queue(Print(&line.text))?;
                self.out.queue(ResetColor)?;
            }
        }
        Ok(())
    }

}

impl<W: Write + Send> Screen for Terminal<W> {
    fn size(&self) -> io::Result<Dimensions> {
        let (width, height) = terminal::size()?;
        Ok(Dimensions { width, height })
    }

    fn draw(&mut self, lines: &[Line]) -> io::Result<()> {
        if !self.restored && self.screen_lost.swap(false, Ordering::AcqRel) {
            self.out.queue(terminal::EnterAlternateScreen)?;
            self.out.queue(terminal::Clear(terminal::ClearType::All))?;
        }
        self.out.queue(cursor::Hide)?;
        for (row, line) in lines.iter().enumerate() {
            let Ok(row) = u16::try_from(row) else { break };
            self.paint_line(row, line)?;
        }
        self.out.flush()
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.out.queue(ResetColor)?;
        self.out.queue(cursor::Show)?;
        self.out.queue(terminal::LeaveAlternateScreen)?;
        self.out.flush()
    }
}

impl<W: Write + Send> Drop for Terminal<W> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn install_panic_hook(screen_lost: Arc<AtomicBool>) {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let mut stdout = io::stdout();
        let _ = stdout.execute(cursor::Show);
        let _ = stdout.execute(terminal::LeaveAlternateScreen);
        screen_lost.store(true, Ordering::Release);
        original_hook(panic_info);
    }));
}
