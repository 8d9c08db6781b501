//! Strings with embedded variable references, e.g. `cc -c $in -o $out`, and
//! their expansion into plain strings.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// An environment providing a mapping of variable name to variable value.
/// Expansion may consult several, earliest first.
pub trait Env {
    fn get_var(&self, var: &str) -> Option<Cow<str>>;
}

impl Env for BTreeMap<String, String> {
    fn get_var(&self, var: &str) -> Option<Cow<str>> {
        self.get(var).map(|v| Cow::Borrowed(v.as_str()))
    }
}

/// One token within a template, either literal text or a variable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalPart<'a> {
    Literal(&'a str),
    VarRef(&'a str),
}

fn is_var_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Splits a template into parts.  `$$` is a literal dollar; a `$` followed by
/// neither a name nor `{name}` is kept as is.
pub struct EvalParser<'a> {
    text: &'a str,
    ofs: usize,
}

impl<'a> EvalParser<'a> {
    pub fn new(text: &'a str) -> Self {
        EvalParser { text, ofs: 0 }
    }

    /// Parses a reference at `ofs`, which points just past a `$`.
    /// Returns the part and the offset following it.
    fn read_ref(&self, ofs: usize) -> (EvalPart<'a>, usize) {
        let bytes = self.text.as_bytes();
        match bytes.get(ofs) {
            Some(b'$') => (EvalPart::Literal("$"), ofs + 1),
            Some(b'{') => match self.text[ofs + 1..].find('}') {
                Some(len) => (
                    EvalPart::VarRef(&self.text[ofs + 1..ofs + 1 + len]),
                    ofs + len + 2,
                ),
                None => (EvalPart::Literal("$"), ofs),
            },
            _ => {
                let len = bytes[ofs..].iter().take_while(|&&c| is_var_char(c)).count();
                if len == 0 {
                    (EvalPart::Literal("$"), ofs)
                } else {
                    (EvalPart::VarRef(&self.text[ofs..ofs + len]), ofs + len)
                }
            }
        }
    }
}

impl<'a> Iterator for EvalParser<'a> {
    type Item = EvalPart<'a>;

    fn next(&mut self) -> Option<EvalPart<'a>> {
        let rest = &self.text[self.ofs..];
        if rest.is_empty() {
            return None;
        }
        match rest.find('$') {
            Some(0) => {
                let (part, next) = self.read_ref(self.ofs + 1);
                self.ofs = next;
                Some(part)
            }
            Some(len) => {
                self.ofs += len;
                Some(EvalPart::Literal(&rest[..len]))
            }
            None => {
                self.ofs = self.text.len();
                Some(EvalPart::Literal(rest))
            }
        }
    }
}

/// Expands variable references in `template`, looking each variable up in
/// the earliest Env that has it.  Unknown variables expand to nothing.
/// Values are inserted as is, without further expansion.
pub fn expand(template: &str, envs: &[&dyn Env]) -> String {
    if !template.contains('$') {
        return template.to_string();
    }
    let mut result = String::with_capacity(template.len());
    for part in EvalParser::new(template) {
        match part {
            EvalPart::Literal(s) => result.push_str(s),
            EvalPart::VarRef(var) => {
                if let Some(value) = envs.iter().find_map(|env| env.get_var(var)) {
                    result.push_str(&value);
                }
            }
        }
    }
    result
}
