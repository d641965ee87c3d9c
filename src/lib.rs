//! chm_perfect_hash — minimal perfect hashing by the CHM (Czech–Havas–
//! Majewski) construction.
//!
//! - Build once on an ordered list of **unique** keys; each key's hash is
//!   its position in the list.
//! - Lookup: `(G[f1(key)] + G[f2(key)]) % G.len()` with two salted hash
//!   functions and the vertex value table `G`.
//! - Robust: cyclic graphs trigger a retry with fresh salts, the vertex
//!   count grows on repeated failure up to a configurable cap.
//! - Emits the result as Python or C# source via token templates.

mod chm;
mod codegen;
mod graph;
mod keyfile;
mod salt;

pub use chm::{GenConfig, Generator, MphError, PerfectHash, parse_replay, replay};
pub use codegen::{
    CSharpCodeGenerator, CodeGenerator, PythonCodeGenerator, RenderOptions, generator_for,
};
pub use graph::Graph;
pub use keyfile::{TableOptions, read_table};
pub use salt::{IntSaltHash, SALT_CHARS, SaltHash, SaltKind, StrSaltHash};
