use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines render event log. Write failures are swallowed; logging never
/// fails a render.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: Box<dyn Write + Send>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: Box::new(writer),
                counters: BTreeMap::new(),
            })),
        }
    }

    /// Writes one event line. `fields` must be a JSON object; `type` is added first.
    pub fn event(&self, kind: &str, fields: Value) {
        let mut line = Map::new();
        line.insert("type".to_string(), Value::String(kind.to_string()));
        if let Value::Object(fields) = fields {
            line.extend(fields);
        }
        self.increment(kind, 1);
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{}", Value::Object(line));
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let line = json!({
                "type": "debug.summary",
                "context": context,
                "counts": counters,
            });
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// In-memory sink shared between a logger and the test reading it back.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn lines(&self) -> Vec<serde_json::Value> {
            let data = self.0.lock().map(|d| d.clone()).unwrap_or_default();
            String::from_utf8_lossy(&data)
                .lines()
                .filter_map(|line| serde_json::from_str(line).ok())
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut data) = self.0.lock() {
                data.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
