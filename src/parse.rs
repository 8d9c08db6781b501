//! Parser for buildfiles.
//!
//! A buildfile is a sequence of line-oriented statements.  Indented
//! `key = value` lines following a statement belong to it.
//!
//! To avoid allocations parsing uses references into the input text, marked
//! with the lifetime `'text`.

use crate::scanner::{ParseError, ParseResult, Scanner};
use std::path::Path;

/// A `key = value` line.  The value is unexpanded.
#[derive(Debug, PartialEq)]
pub struct Binding<'text> {
    pub key: &'text str,
    pub value: &'text str,
}

/// A `NAME = PATH` target declaration.
#[derive(Debug, PartialEq)]
pub struct Decl<'text> {
    pub name: &'text str,
    pub path: &'text str,
}

#[derive(Debug, PartialEq)]
pub struct Build<'text> {
    pub outs: Vec<Decl<'text>>,
    pub kind: &'text str,
    /// Target references, `NAME` or `DIR/NAME`.
    pub ins: Vec<&'text str>,
    pub vars: Vec<Binding<'text>>,
}

#[derive(Debug, PartialEq)]
pub enum Statement<'text> {
    Depends(&'text str),
    Rule {
        kind: &'text str,
        vars: Vec<Binding<'text>>,
    },
    Settings {
        kind: &'text str,
        vars: Vec<Binding<'text>>,
    },
    File(Decl<'text>),
    Source(Decl<'text>),
    Build(Build<'text>),
    Default(&'text str),
}

// 256-entry lookup table bitmap encoded as 4 64-bit integers.
type Bitmap = [u64; 4];

/// Returns a (index, mask) tuple for testing/setting the n-th bit in a bitmap.
#[inline(always)]
const fn bitmap_index_and_mask(c: u8) -> (usize, u64) {
    let index = c as usize >> 6;
    let mask = 1u64 << (c & 63);
    (index, mask)
}

const fn is_ident_char_baseline(c: u8) -> bool {
    matches!(c as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.')
}

/// Path characters include variable references and any non-ASCII byte.
const fn is_path_char_baseline(c: u8) -> bool {
    is_ident_char_baseline(c)
        || c >= 0x80
        || matches!(c as char, '/' | '\\' | ',' | '+' | '@' | '$' | '{' | '}' | '~')
}

/// Generates a character matching lookup table at compile time.
const fn ident_char_bitmap() -> Bitmap {
    let mut bitmap = [0u64; 4];
    let mut c = 0u8;
    loop {
        if is_ident_char_baseline(c) {
            let (index, mask) = bitmap_index_and_mask(c);
            bitmap[index] |= mask;
        }
        match c {
            u8::MAX => break,
            _ => c += 1,
        }
    }
    bitmap
}

/// Lookup table implementation of is_ident_char. Produces same output as
/// _baseline version.
fn is_ident_char(c: u8) -> bool {
    const BITMAP: Bitmap = ident_char_bitmap();
    let (index, mask) = bitmap_index_and_mask(c);
    (BITMAP[index] & mask) != 0
}

const fn path_char_bitmap() -> Bitmap {
    let mut bitmap = [0u64; 4];
    let mut c = 0u8;
    loop {
        if is_path_char_baseline(c) {
            let (index, mask) = bitmap_index_and_mask(c);
            bitmap[index] |= mask;
        }
        match c {
            u8::MAX => break,
            _ => c += 1,
        }
    }
    bitmap
}

fn is_path_char(c: u8) -> bool {
    const BITMAP: Bitmap = path_char_bitmap();
    let (index, mask) = bitmap_index_and_mask(c);
    (BITMAP[index] & mask) != 0
}

pub struct Parser<'text> {
    scanner: Scanner<'text>,
}

impl<'text> Parser<'text> {
    /// `buf` must be valid UTF-8 and nul-terminated.
    pub fn new(buf: &'text [u8]) -> Parser<'text> {
        Parser {
            scanner: Scanner::new(buf),
        }
    }

    pub fn format_parse_error(&self, filename: &Path, err: ParseError) -> String {
        self.scanner.format_parse_error(filename, err)
    }

    /// Reads the next statement along with the line it starts on.
    pub fn read(&mut self) -> ParseResult<Option<(usize, Statement<'text>)>> {
        loop {
            match self.scanner.peek() {
                '\0' => return Ok(None),
                '\n' | '\r' | '#' => self.scanner.expect_line_end()?,
                ' ' | '\t' => {
                    self.scanner.skip_blanks();
                    if !self.scanner.at_line_end() && self.scanner.peek() != '#' {
                        return self.scanner.parse_error("unexpected indentation");
                    }
                    self.scanner.expect_line_end()?;
                }
                _ => {
                    let line = self.scanner.line;
                    let start = self.scanner.ofs;
                    let word = self.read_ident()?;
                    self.scanner.skip_blanks();
                    let stmt = match word {
                        "depends" => {
                            let dir = self.read_path()?;
                            self.scanner.expect_line_end()?;
                            Statement::Depends(dir)
                        }
                        "rule" => {
                            let kind = self.read_ident()?;
                            self.scanner.expect_line_end()?;
                            Statement::Rule {
                                kind,
                                vars: self.read_vars()?,
                            }
                        }
                        "settings" => {
                            let kind = self.read_ident()?;
                            self.scanner.expect_line_end()?;
                            Statement::Settings {
                                kind,
                                vars: self.read_vars()?,
                            }
                        }
                        "file" => Statement::File(self.read_decl_line()?),
                        "source" => Statement::Source(self.read_decl_line()?),
                        "build" => Statement::Build(self.read_build()?),
                        "default" => {
                            let target = self.read_path()?;
                            self.scanner.expect_line_end()?;
                            Statement::Default(target)
                        }
                        _ => {
                            self.scanner.ofs = start;
                            return self
                                .scanner
                                .parse_error(format!("unknown statement {:?}", word));
                        }
                    };
                    return Ok(Some((line, stmt)));
                }
            }
        }
    }

    fn read_ident(&mut self) -> ParseResult<&'text str> {
        let start = self.scanner.ofs;
        while is_ident_char(self.scanner.peek_byte()) {
            self.scanner.next();
        }
        if self.scanner.ofs == start {
            return self.scanner.parse_error("expected identifier");
        }
        Ok(self.scanner.slice(start, self.scanner.ofs))
    }

    fn read_path(&mut self) -> ParseResult<&'text str> {
        let start = self.scanner.ofs;
        while is_path_char(self.scanner.peek_byte()) {
            self.scanner.next();
        }
        if self.scanner.ofs == start {
            return self.scanner.parse_error("expected path");
        }
        Ok(self.scanner.slice(start, self.scanner.ofs))
    }

    fn read_decl(&mut self) -> ParseResult<Decl<'text>> {
        let name = self.read_ident()?;
        self.scanner.skip_blanks();
        self.scanner.expect('=')?;
        self.scanner.skip_blanks();
        let path = self.read_path()?;
        Ok(Decl { name, path })
    }

    fn read_decl_line(&mut self) -> ParseResult<Decl<'text>> {
        let decl = self.read_decl()?;
        self.scanner.expect_line_end()?;
        Ok(decl)
    }

    fn read_build(&mut self) -> ParseResult<Build<'text>> {
        let mut outs = Vec::new();
        loop {
            outs.push(self.read_decl()?);
            self.scanner.skip_blanks();
            if self.scanner.skip(':') {
                break;
            }
            if self.scanner.at_line_end() {
                return self.scanner.parse_error("expected ':'");
            }
        }
        self.scanner.skip_blanks();
        let kind = self.read_ident()?;

        let mut ins = Vec::new();
        loop {
            self.scanner.skip_blanks();
            if self.scanner.at_line_end() || self.scanner.peek() == '#' {
                break;
            }
            ins.push(self.read_path()?);
        }
        self.scanner.expect_line_end()?;

        Ok(Build {
            outs,
            kind,
            ins,
            vars: self.read_vars()?,
        })
    }

    /// Reads the indented `key = value` lines following a statement.
    fn read_vars(&mut self) -> ParseResult<Vec<Binding<'text>>> {
        let mut vars = Vec::new();
        while matches!(self.scanner.peek(), ' ' | '\t') {
            self.scanner.skip_blanks();
            if self.scanner.at_line_end() || self.scanner.peek() == '#' {
                self.scanner.expect_line_end()?;
                continue;
            }
            let key = self.read_ident()?;
            self.scanner.skip_blanks();
            self.scanner.expect('=')?;
            self.scanner.skip_blanks();
            let start = self.scanner.ofs;
            while !self.scanner.at_line_end() {
                self.scanner.next();
            }
            let value = self.scanner.slice(start, self.scanner.ofs).trim_end();
            self.scanner.expect_line_end()?;
            vars.push(Binding { key, value });
        }
        Ok(vars)
    }
}
