//! Single-line input with history

use std::collections::VecDeque;
use unicode_width::UnicodeWidthStr;

const MAX_HISTORY_SIZE: usize = 100;

#[derive(Debug, Default)]
pub struct LineInput {
    text: String,
    /// Cursor position in chars
    cursor: usize,
    history: VecDeque<String>,
    history_pos: usize,
}

impl LineInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn push(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace
    pub fn pop(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len_chars() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len_chars());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len_chars();
    }

    /// Display column of the cursor
    pub fn cursor_column(&self) -> usize {
        self.text[..self.byte_index(self.cursor)].width()
    }

    /// Take the trimmed text, recording non-empty entries in history
    pub fn submit(&mut self) -> String {
        let input = std::mem::take(&mut self.text).trim().to_string();
        self.cursor = 0;
        if !input.is_empty() && self.history.back() != Some(&input) {
            if self.history.len() >= MAX_HISTORY_SIZE {
                self.history.pop_front();
            }
            self.history.push_back(input.clone());
        }
        self.history_pos = self.history.len();
        input
    }

    pub fn history_up(&mut self) {
        if self.history_pos > 0 {
            self.history_pos -= 1;
            self.set(self.history[self.history_pos].clone());
        }
    }

    pub fn history_down(&mut self) {
        if self.history_pos + 1 < self.history.len() {
            self.history_pos += 1;
            self.set(self.history[self.history_pos].clone());
        } else {
            self.history_pos = self.history.len();
            self.set(String::new());
        }
    }

    fn set(&mut self, text: String) {
        self.text = text;
        self.cursor = self.len_chars();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_handles_multibyte_chars() {
        let mut input = LineInput::new();
        for c in "café".chars() {
            input.push(c);
        }
        input.left();
        input.pop();
        assert_eq!(input.text(), "caé");
        input.home();
        input.delete();
        assert_eq!(input.text(), "aé");
        input.end();
        assert_eq!(input.cursor_column(), 2);
    }

    #[test]
    fn history_skips_repeats() {
        let mut input = LineInput::new();
        for cmd in ["ls", "ls", "pwd"] {
            cmd.chars().for_each(|c| input.push(c));
            input.submit();
        }
        input.history_up();
        assert_eq!(input.text(), "pwd");
        input.history_up();
        assert_eq!(input.text(), "ls");
        input.history_up();
        assert_eq!(input.text(), "ls");
        input.history_down();
        input.history_down();
        assert_eq!(input.text(), "");
    }

    #[test]
    fn submit_trims() {
        let mut input = LineInput::new();
        "  echo hi ".chars().for_each(|c| input.push(c));
        assert_eq!(input.submit(), "echo hi");
        assert_eq!(input.text(), "");
    }
}
