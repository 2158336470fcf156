use crate::types::Datum;
use anyhow::{bail, Context, Result};
use std::io::Write;

/// Destination for converted records
pub trait DatasetWriter {
    fn write(&mut self, datum: &Datum) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Flush and make the written data durable; plain writers only flush
    fn sync(&mut self) -> Result<()> {
        self.flush()
    }

    /// Flush and release the destination. Later writes fail.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Writes each record as one line of plain JSON
pub struct JsonLinesWriter<W: Write> {
    writer: Option<W>,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesWriter {
            writer: Some(writer),
        }
    }

    /// Give back the underlying writer; `None` once closed
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write> DatasetWriter for JsonLinesWriter<W> {
    fn write(&mut self, datum: &Datum) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            bail!("Cannot write to a closed writer");
        };
        let json = serde_json::to_string(datum).context("Failed to serialize record")?;
        writeln!(writer, "{}", json).context("Failed to write record")
    }

    fn flush(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().context("Failed to flush writer"),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}
