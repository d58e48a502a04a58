/// Incremental decoder for `text/event-stream` bodies.
///
/// Yields the joined `data:` payload of every complete event. Comments and
/// other fields are ignored; events without data are dropped.
#[derive(Debug, Default)]
pub(super) struct EventDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl EventDecoder {
    /// Feeds raw bytes and returns the payloads of events they completed.
    pub(super) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut completed = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if let Some(payload) = self.accept_line(String::from_utf8_lossy(&line).as_ref()) {
                completed.push(payload);
            }
        }

        completed
    }

    /// Flushes a trailing event that the server closed without a blank line.
    pub(super) fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&line).trim_end_matches('\r').to_owned();
            if let Some(payload) = self.accept_line(line.as_str()) {
                return Some(payload);
            }
        }
        self.dispatch()
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        if field == "data" {
            self.data_lines
                .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(payload)
    }
}
