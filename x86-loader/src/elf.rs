//! ELF `.symtab`/`.strtab` ingestion for the function tracer, grounded on
//! `init_ftrace`'s section-header walk: find `SHT_SYMTAB`, pull its linked
//! string table, keep only `STT_FUNC` entries. `goblin` replaces the
//! manual `fread`-into-struct parsing with a safe parsed view.

use goblin::elf::sym::STT_FUNC;
use goblin::elf::Elf;
use thiserror::Error;
use x86_dbg::SymbolResolver;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to parse ELF file: {0}")]
    Parse(#[from] goblin::error::Error),
}

struct SymbolEntry {
    name: String,
    addr: u32,
    size: u32,
}

/// Function symbols pulled from an ELF image, queried by address range.
/// Mirrors `find_symbol`'s linear scan; a few hundred symbols is a
/// non-issue at that cost and keeps the table trivially easy to build.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<SymbolEntry>,
}

impl SymbolTable {
    /// Parses `bytes` as an ELF image and keeps every `STT_FUNC` symbol
    /// with a non-empty name. Symbols outside the i386 32-bit address
    /// space are truncated via `as u32`, matching the core's flat
    /// 32-bit address model.
    pub fn from_elf_bytes(bytes: &[u8]) -> Result<Self, LoaderError> {
        let elf = Elf::parse(bytes)?;
        let mut symbols = Vec::new();
        for sym in elf.syms.iter() {
            if sym.st_type() != STT_FUNC {
                continue;
            }
            let Some(name) = elf.strtab.get_at(sym.st_name) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            symbols.push(SymbolEntry {
                name: name.to_string(),
                addr: sym.st_value as u32,
                size: sym.st_size as u32,
            });
        }
        tracing::info!(count = symbols.len(), "loaded function symbols from ELF image");
        Ok(Self { symbols })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, addr: u32) -> &str {
        for sym in &self.symbols {
            if addr >= sym.addr && addr < sym.addr + sym.size {
                return &sym.name;
            }
        }
        "???"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_resolves_everything_to_unknown() {
        let table = SymbolTable::default();
        assert_eq!(table.resolve(0x1000), "???");
        assert!(table.is_empty());
    }

    #[test]
    fn invalid_elf_bytes_produce_a_typed_error() {
        let err = SymbolTable::from_elf_bytes(b"not an elf file");
        assert!(err.is_err());
    }
}
