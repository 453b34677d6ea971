use std::collections::VecDeque;

/// Input queue and output record of a machine.
///
/// Input is consumed oldest-first. Output is append-only; `last_output`
/// always mirrors the tail of the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channels {
    input: VecDeque<i64>,
    output: Vec<i64>,
}

impl Channels {
    pub fn new(input: &[i64]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Pop the oldest queued value. `None` means the caller has to wait,
    /// not that anything went wrong.
    pub fn consume_input(&mut self) -> Option<i64> {
        self.input.pop_front()
    }

    pub fn push_input(&mut self, value: i64) {
        self.input.push_back(value);
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    pub fn emit(&mut self, value: i64) {
        self.output.push(value);
    }

    pub fn last_output(&self) -> Option<i64> {
        self.output.last().copied()
    }

    pub fn output_log(&self) -> &[i64] {
        &self.output
    }

    /// Hand the output produced so far to the caller and start a fresh log.
    pub fn take_output(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_is_fifo() {
        let mut io = Channels::new(&[1, 2]);
        io.push_input(3);
        assert_eq!(io.consume_input(), Some(1));
        assert_eq!(io.consume_input(), Some(2));
        assert_eq!(io.consume_input(), Some(3));
        assert_eq!(io.consume_input(), None);
    }

    #[test]
    fn test_empty_input_is_not_sticky() {
        let mut io = Channels::new(&[]);
        assert_eq!(io.consume_input(), None);
        io.push_input(7);
        assert_eq!(io.pending_input(), 1);
        assert_eq!(io.consume_input(), Some(7));
    }

    #[test]
    fn test_emit_tracks_last_and_log() {
        let mut io = Channels::new(&[]);
        assert_eq!(io.last_output(), None);
        io.emit(5);
        io.emit(-9);
        assert_eq!(io.last_output(), Some(-9));
        assert_eq!(io.output_log(), &[5, -9]);
    }

    #[test]
    fn test_take_output_clears_log() {
        let mut io = Channels::new(&[]);
        io.emit(1);
        io.emit(2);
        assert_eq!(io.take_output(), vec![1, 2]);
        assert!(io.output_log().is_empty());
        assert_eq!(io.last_output(), None);
    }
}
