//! Splits the byte stream coming out of a device's UART into lines.

/// Upper bound for a single line, a device that never sends a newline
/// should not make us buffer forever.
const MAX_LINE_LEN: usize = 4096;

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed received bytes, returning every line they complete.
    ///
    /// Line terminators (`\n` and a preceding `\r`) are stripped. Invalid
    /// UTF-8 is replaced rather than rejected, shells do print garbage
    /// during boot.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in bytes {
            if byte == b'\n' {
                lines.push(self.take());
                continue;
            }

            self.pending.push(byte);

            if self.pending.len() >= MAX_LINE_LEN {
                lines.push(self.take());
            }
        }

        lines
    }

    /// Bytes received after the last complete line.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    fn take(&mut self) -> String {
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }

        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}
