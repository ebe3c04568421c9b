//! Shared command implementations for the `preeditool`/`userdbtool`
//! binaries, split out the way the teacher keeps `lex-cli`'s `commands`
//! module separate from its `bin/` entry points (clap parsing stays in
//! the binary, the actual work lives here so it's testable on its own).

pub mod commands;
