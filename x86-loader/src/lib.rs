//! Image loading: flat binaries land straight in RAM, ELF binaries
//! additionally hand their function symbols to `x86-dbg`'s `ftrace` sink
//! through `SymbolTable`, the one concrete `SymbolResolver`.

pub mod elf;
pub mod flat;

pub use elf::{LoaderError, SymbolTable};
pub use flat::load_flat;
