//! TypeScript: ES module syntax plus `import x = require('x')`.

use super::esm::Scan;
use super::{bool_option, check_keys, ExtractError, ExtractOptions, ImportExtractor, ModuleSystem};

const OPTIONS: &[&str] = &["dynamic", "skipTypeImports"];

/// Extracts TypeScript imports.
///
/// `skipTypeImports` drops `import type` and `export type` declarations,
/// which are erased at compile time and need no runtime dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptExtractor;

impl ImportExtractor for TypeScriptExtractor {
    fn module_system(&self) -> ModuleSystem {
        ModuleSystem::TypeScript
    }

    fn validate_options(&self, options: &ExtractOptions) -> Result<(), ExtractError> {
        check_keys(options, OPTIONS)?;
        bool_option(options, "dynamic", true)?;
        bool_option(options, "skipTypeImports", false)?;
        Ok(())
    }

    fn extract(&self, source: &str, options: &ExtractOptions) -> Result<Vec<String>, ExtractError> {
        self.validate_options(options)?;
        Scan {
            dynamic: bool_option(options, "dynamic", true)?,
            skip_type_imports: bool_option(options, "skipTypeImports", false)?,
            import_equals: true,
        }
        .run(source)
    }
}
