//! Scans C/C++ source text for #include directives.
//!
//! This is deliberately not a preprocessor: a directive is any
//! `#include "path"` or `#include <path>` found on a line, with optional
//! spaces or tabs after the `#`.  Conditional compilation is ignored, so the
//! include set is a superset of what a compiler reads.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub path: String,
    /// `#include "x"` as opposed to `#include <x>`.
    pub quoted: bool,
}

fn skip_blanks(line: &[u8], mut ofs: usize) -> usize {
    while ofs < line.len() && (line[ofs] == b' ' || line[ofs] == b'\t') {
        ofs += 1;
    }
    ofs
}

/// Attempts to read a directive whose '#' is at `line[hash]`.
/// Ok(None) means there is no directive here; Err means the directive's
/// path is not valid UTF-8.
fn read_directive(line: &[u8], hash: usize) -> Result<Option<Include>, ()> {
    let mut ofs = skip_blanks(line, hash + 1);
    if !line[ofs..].starts_with(b"include") {
        return Ok(None);
    }
    ofs += b"include".len();
    let after = skip_blanks(line, ofs);
    if after == ofs || after == line.len() {
        return Ok(None);
    }
    let (close, quoted) = match line[after] {
        b'"' => (b'"', true),
        b'<' => (b'>', false),
        _ => return Ok(None),
    };
    let start = after + 1;
    let len = match line[start..].iter().position(|&c| c == close) {
        Some(len) => len,
        None => return Ok(None),
    };
    let path = std::str::from_utf8(&line[start..start + len]).map_err(|_| ())?;
    Ok(Some(Include {
        path: path.to_string(),
        quoted,
    }))
}

/// Lists the include directives in `buf`, in order of appearance.
/// Returns None if the text cannot be interpreted.
pub fn scan(buf: &[u8]) -> Option<Vec<Include>> {
    let mut includes = Vec::new();
    for line in buf.split(|&c| c == b'\n') {
        let mut ofs = 0;
        while let Some(hash) = line[ofs..].iter().position(|&c| c == b'#') {
            let hash = ofs + hash;
            if let Some(include) = read_directive(line, hash).ok()? {
                includes.push(include);
            }
            ofs = hash + 1;
        }
    }
    Some(includes)
}
