use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, RoadSegError};

/// Run parameters and results, appended to a text log as `key:value` lines.
///
/// Each append starts with a blank-line separator so consecutive runs stay
/// distinguishable in one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLog {
    entries: Vec<(String, String)>,
}

impl RunLog {
    pub fn new() -> RunLog {
        RunLog::default()
    }

    pub fn push(&mut self, key: &str, value: impl Display) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    /// Records a list as `[a, b, c]`.
    pub fn push_list(&mut self, key: &str, values: &[f32]) {
        let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.push(key, format!("[{}]", items.join(", ")));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn render(&self) -> String {
        let mut out = String::from("\n\n");
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    pub fn append_to(&self, path: &Path) -> Result<()> {
        let io_err = |source| RoadSegError::Io { path: path.to_path_buf(), source };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        file.write_all(self.render().as_bytes()).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_key_value_lines_after_a_separator() {
        let mut log = RunLog::new();
        log.push("Batch_size", 16);
        log.push_list("Average_acc_test", &[50.0, 62.5]);
        assert_eq!(log.render(), "\n\nBatch_size:16\nAverage_acc_test:[50, 62.5]\n");
        assert_eq!(log.get("Batch_size"), Some("16"));
        assert_eq!(log.get("f1"), None);
    }

    #[test]
    fn appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log_file.txt");
        std::fs::write(&path, "previous run").unwrap();

        let mut log = RunLog::new();
        log.push("N_epochs", 1);
        log.append_to(&path).unwrap();
        log.append_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "previous run\n\nN_epochs:1\n\n\nN_epochs:1\n");
    }
}
