//! Plain-text editor buffer
//!
//! Edits report whether they changed the text so the owner can mark the
//! document dirty. `set_text` is a load, not an edit.

use unicode_width::UnicodeWidthStr;

#[derive(Debug)]
pub struct Editor {
    lines: Vec<String>,
    row: usize,
    /// Cursor column in chars
    col: usize,
    /// First visible line
    pub scroll: usize,
    /// First visible display column
    pub hscroll: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
            scroll: 0,
            hscroll: 0,
        }
    }
}

fn byte_index(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replace the buffer; CRLF is normalized to LF
    pub fn set_text(&mut self, text: &str) {
        let text = text.replace("\r\n", "\n");
        self.lines = text.split('\n').map(str::to_string).collect();
        self.row = 0;
        self.col = 0;
        self.scroll = 0;
        self.hscroll = 0;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    pub fn insert_char(&mut self, c: char) -> bool {
        let at = byte_index(&self.lines[self.row], self.col);
        self.lines[self.row].insert(at, c);
        self.col += 1;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        let at = byte_index(&self.lines[self.row], self.col);
        let rest = self.lines[self.row].split_off(at);
        self.row += 1;
        self.lines.insert(self.row, rest);
        self.col = 0;
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.col > 0 {
            self.col -= 1;
            let at = byte_index(&self.lines[self.row], self.col);
            self.lines[self.row].remove(at);
            true
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&line);
            true
        } else {
            false
        }
    }

    pub fn delete(&mut self) -> bool {
        if self.col < self.line_len(self.row) {
            let at = byte_index(&self.lines[self.row], self.col);
            self.lines[self.row].remove(at);
            true
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
            true
        } else {
            false
        }
    }

    pub fn left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn up(&mut self, n: usize) {
        self.row = self.row.saturating_sub(n);
        self.col = self.col.min(self.line_len(self.row));
    }

    pub fn down(&mut self, n: usize) {
        self.row = (self.row + n).min(self.lines.len() - 1);
        self.col = self.col.min(self.line_len(self.row));
    }

    pub fn home(&mut self) {
        self.col = 0;
    }

    pub fn end(&mut self) {
        self.col = self.line_len(self.row);
    }

    /// Display column of the cursor in its line
    pub fn cursor_column(&self) -> usize {
        let line = &self.lines[self.row];
        line[..byte_index(line, self.col)].width()
    }

    /// Keep the cursor inside a `width` x `height` viewport
    pub fn scroll_into_view(&mut self, width: usize, height: usize) {
        if height > 0 {
            if self.row < self.scroll {
                self.scroll = self.row;
            } else if self.row >= self.scroll + height {
                self.scroll = self.row + 1 - height;
            }
        }
        if width > 0 {
            let column = self.cursor_column();
            if column < self.hscroll {
                self.hscroll = column;
            } else if column >= self.hscroll + width {
                self.hscroll = column + 1 - width;
            }
        }
    }
}
