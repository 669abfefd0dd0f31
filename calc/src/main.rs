//
// Copyright (c) 2025 Hemi Labs, Inc.
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    env_logger::init();
    let args = shadertools_calc::Args::parse();

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    match shadertools_calc::run(stdout, stderr, args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}
