//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::process::ExitCode;

use clap::Parser;
use shadertools_preprocess::error::GetExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args = shadertools_preprocess::Args::parse();

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    match shadertools_preprocess::run(stdout, stderr, args) {
        Err(error) => ExitCode::from(u8::try_from(error.get_exit_code()).unwrap_or(1)),
        _ => ExitCode::SUCCESS,
    }
}
