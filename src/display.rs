use std::io::{self, Write};

pub const CURSOR: &str = "▌";
const ERASE_CURSOR: &str = "\u{8} \u{8}";

/// Writes a streamed answer to a terminal, keeping a cursor marker after the
/// text until the answer is finished.
pub struct StreamDisplay<W: Write> {
    out: W,
    cursor_shown: bool,
}

impl<W: Write> StreamDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cursor_shown: false,
        }
    }

    pub fn push(&mut self, fragment: &str) -> io::Result<()> {
        self.erase_cursor()?;
        write!(self.out, "{fragment}{CURSOR}")?;
        self.cursor_shown = true;
        self.out.flush()
    }

    /// Removes the cursor and ends the line.
    pub fn finish(&mut self) -> io::Result<()> {
        self.erase_cursor()?;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn erase_cursor(&mut self) -> io::Result<()> {
        if self.cursor_shown {
            self.out.write_all(ERASE_CURSOR.as_bytes())?;
            self.cursor_shown = false;
        }
        Ok(())
    }
}
