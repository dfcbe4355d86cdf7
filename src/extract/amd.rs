//! AMD: `define([...], factory)` and `require([...], callback)`.

use std::sync::LazyLock;

use regex::Regex;

use super::commonjs::call_argument;
use super::lexer::{skip_whitespace, Lexed};
use super::{bool_option, check_keys, ExtractError, ExtractOptions, ImportExtractor, ModuleSystem};

const OPTIONS: &[&str] = &["skipCommonJs"];

/// Dependency names with a special meaning inside a define call.
const SPECIAL: &[&str] = &["require", "exports", "module"];

static CALLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])(define|require)\s*\(").expect("AMD call pattern is valid")
});

/// Extracts AMD dependency arrays and sugared `require('x')` calls.
///
/// `skipCommonJs` ignores the sugared form.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmdExtractor;

impl ImportExtractor for AmdExtractor {
    fn module_system(&self) -> ModuleSystem {
        ModuleSystem::Amd
    }

    fn validate_options(&self, options: &ExtractOptions) -> Result<(), ExtractError> {
        check_keys(options, OPTIONS)?;
        bool_option(options, "skipCommonJs", false)?;
        Ok(())
    }

    fn extract(&self, source: &str, options: &ExtractOptions) -> Result<Vec<String>, ExtractError> {
        self.validate_options(options)?;
        let skip_commonjs = bool_option(options, "skipCommonJs", false)?;

        let lexed = Lexed::new(source);
        let mut specifiers = Vec::new();

        for call in lexed.find_keywords(&CALLS) {
            let is_define = &source[call.clone()] == "define";
            let paren = skip_whitespace(lexed.code(), call.end);
            let mut arg = skip_whitespace(lexed.code(), paren + 1);

            // define('id', [...], factory)
            if is_define {
                if let Some(lit) = lexed.literal_at(arg).filter(|l| l.is_string()) {
                    let comma = skip_whitespace(lexed.code(), lit.end);
                    if lexed.byte_at(comma) != Some(b',') {
                        continue;
                    }
                    arg = skip_whitespace(lexed.code(), comma + 1);
                }
            }

            match lexed.byte_at(arg) {
                Some(b'[') => dependency_array(&lexed, source, arg, &mut specifiers)?,
                _ if !is_define && !skip_commonjs => {
                    if let Some(spec) = call_argument(&lexed, source, call.end)? {
                        specifiers.push(spec);
                    }
                }
                _ => {}
            }
        }
        Ok(specifiers)
    }
}

/// Collect the string elements of the array opening at `open`.
fn dependency_array(
    lexed: &Lexed,
    source: &str,
    open: usize,
    specifiers: &mut Vec<String>,
) -> Result<(), ExtractError> {
    let mut pos = open + 1;
    loop {
        pos = skip_whitespace(lexed.code(), pos);
        match lexed.byte_at(pos) {
            None => {
                return Err(ExtractError::parse_at(
                    source,
                    open,
                    "unterminated dependency array",
                ))
            }
            Some(b']') => return Ok(()),
            _ => {}
        }

        if let Some(lit) = lexed.literal_at(pos).copied() {
            if lit.is_string() && !lit.terminated {
                return Err(ExtractError::parse_at(source, pos, "unterminated string literal"));
            }
            if lit.is_static_string(source) {
                let name = lit.contents(source);
                if !SPECIAL.contains(&name) {
                    specifiers.push(name.to_string());
                }
            }
            pos = lit.end;
        } else {
            pos += 1;
        }
    }
}
