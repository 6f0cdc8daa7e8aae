use std::io::{BufRead, Write};

use crate::error::{AppError, AppResult};

/// Newline-delimited JSON over a reader/writer pair (stdin/stdout in production).
pub struct NdjsonIo<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> NdjsonIo<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// `None` at end of input; blank lines come back as empty strings.
    pub fn read_line(&mut self) -> AppResult<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Ok(Some(String::new()));
        }
        Ok(Some(line.to_string()))
    }

    pub fn write_json_line<T: serde::Serialize>(&mut self, v: &T) -> AppResult<()> {
        serde_json::to_writer(&mut self.writer, v)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Reply to a line that could not be parsed as a request.
    pub fn protocol_error(&mut self, msg: String) -> AppResult<()> {
        #[derive(serde::Serialize)]
        struct ErrResp {
            v: u32,
            id: &'static str,
            status: &'static str,
            error: String,
            code: &'static str,
        }
        let r = ErrResp {
            v: super::protocol::PROTOCOL_VERSION,
            id: "",
            status: "error",
            error: msg,
            code: AppError::InvalidRequest(String::new()).code(),
        };
        self.write_json_line(&r)
    }
}
