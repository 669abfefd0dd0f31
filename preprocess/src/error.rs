//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

/// Errors raised while preprocessing a translation unit.
///
/// The variants follow the failure families of the preprocessor: lexical
/// problems in the raw byte stream, malformed directives, semantic misuse
/// of otherwise well-formed directives, and plain I/O trouble from the
/// include machinery.
#[derive(thiserror::Error, Debug)]
pub enum PreprocessError {
    #[error("{0}")]
    Lexical(String),
    #[error("{0}")]
    Directive(String),
    #[error("{0}")]
    Semantic(String),
    #[error("Error processing io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

pub trait GetExitCode {
    fn get_exit_code(&self) -> i32;
}

impl GetExitCode for PreprocessError {
    fn get_exit_code(&self) -> i32 {
        1
    }
}

impl<T> GetExitCode for Result<T> {
    fn get_exit_code(&self) -> i32 {
        match self {
            Ok(_) => 0,
            Err(error) => error.get_exit_code(),
        }
    }
}
