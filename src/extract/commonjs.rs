//! CommonJS: `require('x')`.

use std::sync::LazyLock;

use regex::Regex;

use super::lexer::{skip_whitespace, Lexed};
use super::{check_keys, string_option, ExtractError, ExtractOptions, ImportExtractor, ModuleSystem};

const OPTIONS: &[&str] = &["word"];
const DEFAULT_WORD: &str = "require";

/// Extracts `require` calls with a literal argument.
///
/// The `word` option renames the require function (`word = "load"` matches
/// `load('x')`). Calls with a computed argument are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonJsExtractor;

impl ImportExtractor for CommonJsExtractor {
    fn module_system(&self) -> ModuleSystem {
        ModuleSystem::CommonJs
    }

    fn validate_options(&self, options: &ExtractOptions) -> Result<(), ExtractError> {
        check_keys(options, OPTIONS)?;
        let word = string_option(options, "word", DEFAULT_WORD)?;
        if !word.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return Err(ExtractError::config("word", format!("`{}` is not an identifier", word)));
        }
        Ok(())
    }

    fn extract(&self, source: &str, options: &ExtractOptions) -> Result<Vec<String>, ExtractError> {
        self.validate_options(options)?;
        let word = string_option(options, "word", DEFAULT_WORD)?;

        let custom;
        let re = if word == DEFAULT_WORD {
            &*REQUIRE
        } else {
            custom = call_regex(word)
                .map_err(|e| ExtractError::config("word", e.to_string()))?;
            &custom
        };

        let lexed = Lexed::new(source);
        let mut specifiers = Vec::new();
        for keyword in lexed.find_keywords(re) {
            if let Some(spec) = call_argument(&lexed, source, keyword.end)? {
                specifiers.push(spec);
            }
        }
        Ok(specifiers)
    }
}

static REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| call_regex(DEFAULT_WORD).expect("require pattern is valid"));

/// Matches `word` followed by `(`, not preceded by `.` or an identifier byte.
pub(crate) fn call_regex(word: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?:^|[^.\w$])({})\s*\(", regex::escape(word)))
}

/// The static string argument of the call whose name ends at `name_end`.
///
/// `Ok(None)` for computed arguments; a parse error for an unterminated
/// string argument.
pub(crate) fn call_argument(
    lexed: &Lexed,
    source: &str,
    name_end: usize,
) -> Result<Option<String>, ExtractError> {
    let paren = skip_whitespace(lexed.code(), name_end);
    if lexed.byte_at(paren) != Some(b'(') {
        return Ok(None);
    }
    let arg = skip_whitespace(lexed.code(), paren + 1);
    let literal = match lexed.literal_at(arg) {
        Some(lit) if lit.is_string() => *lit,
        _ => return Ok(None),
    };
    if !literal.terminated {
        return Err(ExtractError::parse_at(source, arg, "unterminated string literal"));
    }
    if !literal.is_static_string(source) {
        return Ok(None);
    }
    let close = skip_whitespace(lexed.code(), literal.end);
    if lexed.byte_at(close) != Some(b')') {
        return Ok(None);
    }
    Ok(Some(literal.contents(source).to_string()))
}
