use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

/// Appends the conversation to a plain-text transcript file.
///
/// Transcript logging is independent of diagnostic logging (which goes
/// through `tracing`); this file is meant to be readable after the session.
pub struct TranscriptLog {
    file_path: Option<String>,
}

impl TranscriptLog {
    /// When a path is given, verify write access up front and stamp a
    /// session header so concatenated sessions stay distinguishable.
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let log = TranscriptLog {
            file_path: log_file,
        };
        if log.file_path.is_some() {
            let started = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            log.write(&format!("## session started {started}"))?;
        }
        Ok(log)
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn log_user(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if self.file_path.is_none() {
            return Ok(());
        }
        self.write(&format!("You: {content}"))
    }

    pub fn log_assistant(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if self.file_path.is_none() || content.is_empty() {
            return Ok(());
        }
        self.write(content)
    }

    fn write(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between entries, matching the on-screen spacing.
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn disabled_log_accepts_writes_silently() {
        let log = TranscriptLog::new(None).unwrap();
        assert!(!log.is_active());
        log.log_user("hello").unwrap();
        log.log_assistant("world").unwrap();
    }

    #[test]
    fn messages_are_appended_with_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.log");
        let log = TranscriptLog::new(Some(path.to_string_lossy().into_owned())).unwrap();
        assert!(log.is_active());

        log.log_user("Hello").unwrap();
        log.log_assistant("Hi there!").unwrap();
        log.log_assistant("").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("## session started "));
        assert!(contents.contains("You: Hello"));
        assert!(contents.contains("Hi there!"));
    }

    #[test]
    fn unwritable_path_fails_at_construction() {
        let result = TranscriptLog::new(Some("/nonexistent-dir/transcript.log".to_string()));
        assert!(result.is_err());
    }
}
