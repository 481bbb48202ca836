use std::fmt::{Debug, Formatter};
use std::io::Write;

/// Where reported keys go, in the order they were pressed.
pub trait KeySink: Debug {
    fn emit(&mut self, key: char) -> std::io::Result<()>;
}

/// Writes every key on its own line and flushes right away.
pub struct LineSink<W: Write> {
    writer: W,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> Debug for LineSink<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LineSink")
    }
}

impl<W: Write> KeySink for LineSink<W> {
    fn emit(&mut self, key: char) -> std::io::Result<()> {
        writeln!(self.writer, "{}", key)?;
        self.writer.flush()
    }
}
