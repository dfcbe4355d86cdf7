//! ES modules: `import` and `export … from` declarations.

use std::sync::LazyLock;

use regex::Regex;

use super::commonjs::call_argument;
use super::lexer::{skip_whitespace, Lexed};
use super::{bool_option, check_keys, ExtractError, ExtractOptions, ImportExtractor, ModuleSystem};

const OPTIONS: &[&str] = &["dynamic"];

static KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])(import|export)\b").expect("module keyword pattern is valid")
});

/// Extracts ES module imports and re-exports.
///
/// With `dynamic` (default on), `import('x')` expressions with a literal
/// argument are included.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsmExtractor;

impl ImportExtractor for EsmExtractor {
    fn module_system(&self) -> ModuleSystem {
        ModuleSystem::Esm
    }

    fn validate_options(&self, options: &ExtractOptions) -> Result<(), ExtractError> {
        check_keys(options, OPTIONS)?;
        bool_option(options, "dynamic", true)?;
        Ok(())
    }

    fn extract(&self, source: &str, options: &ExtractOptions) -> Result<Vec<String>, ExtractError> {
        self.validate_options(options)?;
        let scan = Scan {
            dynamic: bool_option(options, "dynamic", true)?,
            ..Scan::default()
        };
        scan.run(source)
    }
}

/// Declaration scanner shared with the TypeScript extractor.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Scan {
    /// Include `import('x')`
    pub dynamic: bool,
    /// Skip `import type` / `export type` declarations
    pub skip_type_imports: bool,
    /// Accept `import x = require('x')`
    pub import_equals: bool,
}

impl Scan {
    pub(crate) fn run(&self, source: &str) -> Result<Vec<String>, ExtractError> {
        let lexed = Lexed::new(source);
        let mut parser = Parser {
            scan: *self,
            lexed: &lexed,
            source,
            specifiers: Vec::new(),
        };

        for keyword in lexed.find_keywords(&KEYWORDS) {
            match &source[keyword.clone()] {
                "import" => parser.import(keyword.end)?,
                _ => parser.export(keyword.end)?,
            }
        }
        Ok(parser.specifiers)
    }
}

struct Parser<'a> {
    scan: Scan,
    lexed: &'a Lexed,
    source: &'a str,
    specifiers: Vec<String>,
}

/// How an import clause ended.
enum ClauseEnd {
    /// At `from`; the offset is just past the keyword.
    From(usize),
    /// At `=` (TypeScript import-equals); the offset is just past it.
    Equals(usize),
    /// At `;` or `}` or end of input: a local export list.
    Local,
}

impl Parser<'_> {
    fn code(&self) -> &str {
        self.lexed.code()
    }

    fn import(&mut self, after: usize) -> Result<(), ExtractError> {
        let pos = skip_whitespace(self.code(), after);
        match self.lexed.byte_at(pos) {
            // import.meta
            Some(b'.') => return Ok(()),
            Some(b'(') => {
                if self.scan.dynamic {
                    if let Some(spec) = call_argument(self.lexed, self.source, after)? {
                        self.specifiers.push(spec);
                    }
                }
                return Ok(());
            }
            _ => {}
        }

        // import 'side-effect'
        if let Some(lit) = self.lexed.literal_at(pos).filter(|l| l.is_string()) {
            if !lit.terminated {
                return Err(ExtractError::parse_at(self.source, pos, "unterminated string literal"));
            }
            self.specifiers.push(lit.contents(self.source).to_string());
            return Ok(());
        }

        // `import` as a property name or label rather than a declaration
        let starts_clause = matches!(self.lexed.byte_at(pos), Some(b'{') | Some(b'*'))
            || self.lexed.word_at(pos).is_some();
        if !starts_clause {
            return Ok(());
        }

        let type_only = self.is_type_only(pos);
        match self.clause(pos, "import")? {
            ClauseEnd::From(end) => self.module_specifier(end, type_only),
            ClauseEnd::Equals(end) if self.scan.import_equals => {
                let name = skip_whitespace(self.code(), end);
                if self.lexed.word_at(name) == Some("require") {
                    if let Some(spec) = call_argument(self.lexed, self.source, name + "require".len())? {
                        if !(type_only && self.scan.skip_type_imports) {
                            self.specifiers.push(spec);
                        }
                    }
                }
                Ok(())
            }
            ClauseEnd::Equals(end) => Err(ExtractError::parse_at(
                self.source,
                end - 1,
                "unexpected `=` in import declaration",
            )),
            ClauseEnd::Local => Err(ExtractError::parse_at(
                self.source,
                pos,
                "expected `from` in import declaration",
            )),
        }
    }

    fn export(&mut self, after: usize) -> Result<(), ExtractError> {
        let pos = skip_whitespace(self.code(), after);
        let type_only = self.is_type_only(pos);
        let start = if type_only {
            skip_whitespace(self.code(), pos + "type".len())
        } else {
            pos
        };

        // Only `export *` and `export { … }` can re-export.
        match self.lexed.byte_at(start) {
            Some(b'*') | Some(b'{') => {}
            _ => return Ok(()),
        }
        match self.clause(start, "export")? {
            ClauseEnd::From(end) => self.module_specifier(end, type_only),
            _ => Ok(()),
        }
    }

    /// `type` used as a modifier, not as a binding named `type`.
    fn is_type_only(&self, pos: usize) -> bool {
        if self.lexed.word_at(pos) != Some("type") {
            return false;
        }
        let next = skip_whitespace(self.code(), pos + "type".len());
        match self.lexed.byte_at(next) {
            Some(b'{') | Some(b'*') => true,
            Some(b',') | Some(b'=') | None => false,
            Some(_) => self.lexed.word_at(next).is_some_and(|w| w != "from"),
        }
    }

    /// Walk an import/export clause up to `from`.
    fn clause(&self, mut pos: usize, keyword: &str) -> Result<ClauseEnd, ExtractError> {
        loop {
            pos = skip_whitespace(self.code(), pos);
            match self.lexed.byte_at(pos) {
                None | Some(b';') | Some(b'}') => return Ok(ClauseEnd::Local),
                Some(b'{') => pos = self.closing_brace(pos)?,
                Some(b'*') | Some(b',') => pos += 1,
                Some(b'=') => return Ok(ClauseEnd::Equals(pos + 1)),
                Some(_) => match self.lexed.word_at(pos) {
                    Some("from") => return Ok(ClauseEnd::From(pos + "from".len())),
                    Some(word) => pos += word.len(),
                    None if keyword == "export" => return Ok(ClauseEnd::Local),
                    None => {
                        return Err(ExtractError::parse_at(
                            self.source,
                            pos,
                            format!("unexpected token in {} declaration", keyword),
                        ))
                    }
                },
            }
        }
    }

    fn closing_brace(&self, open: usize) -> Result<usize, ExtractError> {
        let rest = &self.code()[open..];
        match rest.find('}') {
            Some(i) => Ok(open + i + 1),
            None => Err(ExtractError::parse_at(self.source, open, "unclosed `{`")),
        }
    }

    /// The string literal after `from`.
    fn module_specifier(&mut self, after_from: usize, type_only: bool) -> Result<(), ExtractError> {
        let pos = skip_whitespace(self.code(), after_from);
        match self.lexed.literal_at(pos) {
            Some(lit) if lit.is_string() && lit.terminated => {
                if !(type_only && self.scan.skip_type_imports) {
                    self.specifiers.push(lit.contents(self.source).to_string());
                }
                Ok(())
            }
            Some(lit) if lit.is_string() => Err(ExtractError::parse_at(
                self.source,
                pos,
                "unterminated string literal",
            )),
            _ => Err(ExtractError::parse_at(
                self.source,
                pos,
                "expected a string literal after `from`",
            )),
        }
    }
}
