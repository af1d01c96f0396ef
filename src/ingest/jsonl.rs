use std::fs::File;
use std::io::{BufRead, BufReader, Lines};

use anyhow::{anyhow, Context, Result};

use super::{LandmarkSource, SourceStats};
use crate::landmark::LandmarkFrame;

/// Recorded landmarks, one JSON array of 21 `[x, y]` pairs per line.
pub struct JsonLinesSource {
    path: String,
    lines: Option<Lines<BufReader<File>>>,
    line_no: u64,
    frame_count: u64,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: None,
            line_no: 0,
            frame_count: 0,
        }
    }
}

impl LandmarkSource for JsonLinesSource {
    fn connect(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open landmark file {}", self.path))?;
        self.lines = Some(BufReader::new(file).lines());
        self.line_no = 0;
        log::info!("JsonLinesSource: reading {}", self.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        if self.lines.is_none() {
            self.connect()?;
        }
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| anyhow!("landmark file {} is not open", self.path))?;
        for line in lines.by_ref() {
            self.line_no += 1;
            let line = line.with_context(|| format!("failed to read {}", self.path))?;
            if line.trim().is_empty() {
                continue;
            }
            let pairs: Vec<[f32; 2]> = serde_json::from_str(&line).with_context(|| {
                format!("{}:{}: malformed landmark line", self.path, self.line_no)
            })?;
            let frame = LandmarkFrame::from_pairs(&pairs)
                .map_err(|e| anyhow!("{}:{}: {}", self.path, self.line_no, e))?;
            self.frame_count += 1;
            return Ok(Some(frame));
        }
        Ok(None)
    }

    fn is_healthy(&self) -> bool {
        self.lines.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn frame_line(x: f32) -> String {
        serde_json::to_string(&vec![[x, 1.0]; 21]).unwrap()
    }

    #[test]
    fn reads_frames_and_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", frame_line(1.0)).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", frame_line(2.0)).unwrap();

        let mut source = JsonLinesSource::new(file.path().to_string_lossy());
        source.connect().unwrap();
        assert!(source.is_healthy());
        assert_eq!(source.next_frame().unwrap().unwrap().points()[0].x, 1.0);
        assert_eq!(source.next_frame().unwrap().unwrap().points()[0].x, 2.0);
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn malformed_lines_are_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, "{}", serde_json::to_string(&vec![[0.0, 0.0]; 3]).unwrap()).unwrap();

        let mut source = JsonLinesSource::new(file.path().to_string_lossy());
        let err = source.next_frame().unwrap_err();
        assert!(err.to_string().contains(":1:"));
        let err = source.next_frame().unwrap_err();
        assert!(err.to_string().contains("expected 21 landmarks"));
    }
}
