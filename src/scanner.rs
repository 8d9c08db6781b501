//! Scans an input string (buildfile) character by character.

use std::path::Path;

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    ofs: usize,
}
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Scanner<'a> {
    buf: &'a [u8],
    pub ofs: usize,
    pub line: usize,
}

impl<'a> Scanner<'a> {
    /// `buf` must be valid UTF-8 followed by a terminating nul.
    pub fn new(buf: &'a [u8]) -> Self {
        if !buf.ends_with(b"\0") {
            panic!("Scanner requires nul-terminated buf");
        }
        debug_assert!(std::str::from_utf8(buf).is_ok());
        Scanner {
            buf,
            ofs: 0,
            line: 1,
        }
    }

    /// Callers only slice between ASCII delimiters, so the slice stays on
    /// character boundaries of the (valid UTF-8) buffer.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        unsafe { std::str::from_utf8_unchecked(self.buf.get_unchecked(start..end)) }
    }
    pub fn peek(&self) -> char {
        unsafe { *self.buf.get_unchecked(self.ofs) as char }
    }
    pub fn peek_byte(&self) -> u8 {
        unsafe { *self.buf.get_unchecked(self.ofs) }
    }
    pub fn peek_newline(&self) -> bool {
        if self.peek() == '\n' {
            return true;
        }
        if self.ofs >= self.buf.len() - 1 {
            return false;
        }
        let peek2 = unsafe { *self.buf.get_unchecked(self.ofs + 1) as char };
        self.peek() == '\r' && peek2 == '\n'
    }
    pub fn at_line_end(&self) -> bool {
        self.peek() == '\0' || self.peek_newline()
    }
    pub fn next(&mut self) {
        if self.peek() == '\n' {
            self.line += 1;
        }
        if self.ofs == self.buf.len() {
            panic!("scanned past end")
        }
        self.ofs += 1;
    }
    pub fn back(&mut self) {
        if self.ofs == 0 {
            panic!("back at start")
        }
        self.ofs -= 1;
        if self.peek() == '\n' {
            self.line -= 1;
        }
    }
    pub fn read(&mut self) -> char {
        let c = self.peek();
        self.next();
        c
    }
    pub fn skip(&mut self, ch: char) -> bool {
        if self.peek() == ch {
            self.next();
            return true;
        }
        false
    }

    /// Skips spaces and tabs.
    pub fn skip_blanks(&mut self) -> bool {
        let start = self.ofs;
        while matches!(self.peek(), ' ' | '\t') {
            self.next();
        }
        self.ofs > start
    }

    /// Skips a comment through the end of its line, if there is one.
    pub fn skip_comment(&mut self) {
        if self.peek() != '#' {
            return;
        }
        while !self.at_line_end() {
            self.next();
        }
    }

    /// Consumes the end of the current line, which may be the end of input.
    pub fn expect_line_end(&mut self) -> ParseResult<()> {
        self.skip_blanks();
        self.skip_comment();
        match self.peek() {
            '\0' => Ok(()),
            '\n' => {
                self.next();
                Ok(())
            }
            '\r' if self.peek_newline() => {
                self.next();
                self.next();
                Ok(())
            }
            c => self.parse_error(format!("expected end of line, got {:?}", c)),
        }
    }

    pub fn expect(&mut self, ch: char) -> ParseResult<()> {
        let r = self.read();
        if r != ch {
            self.back();
            return self.parse_error(format!("expected {:?}, got {:?}", ch, r));
        }
        Ok(())
    }

    pub fn parse_error<T, S: Into<String>>(&self, msg: S) -> ParseResult<T> {
        Err(ParseError {
            msg: msg.into(),
            ofs: self.ofs,
        })
    }

    pub fn format_parse_error(&self, filename: &Path, err: ParseError) -> String {
        let mut msg = "parse error: ".to_string();
        msg.push_str(&err.msg);
        msg.push('\n');

        let text = String::from_utf8_lossy(&self.buf[..self.buf.len() - 1]);
        let mut ofs = 0;
        for (line_number, line) in text.split('\n').enumerate() {
            let len = line.len();
            if ofs + len >= err.ofs {
                let prefix = format!("{}:{}: ", filename.display(), line_number + 1);
                msg.push_str(&prefix);

                let line = line.trim_end_matches('\r');
                let col = line
                    .char_indices()
                    .take_while(|&(i, _)| i < err.ofs - ofs)
                    .count();
                let (context, col) = if col > 40 {
                    // Trim beginning of line to fit it on screen.
                    msg.push_str("...");
                    let skip = col - 20;
                    (line.chars().skip(skip).collect::<String>(), 3 + 20)
                } else {
                    (line.to_string(), col)
                };
                if context.chars().count() > 40 {
                    msg.extend(context.chars().take(40));
                    msg.push_str("...");
                } else {
                    msg.push_str(&context);
                }
                msg.push('\n');

                msg.push_str(&" ".repeat(prefix.len() + col));
                msg.push_str("^\n");
                return msg;
            }
            ofs += len + 1;
        }
        msg
    }
}
