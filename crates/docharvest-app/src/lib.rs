// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docharvest-app — Batch orchestration and the `docharvest` command line.

pub mod cli;
pub mod pipeline;

pub use pipeline::{BatchReport, FileFailure, FileReport, Pipeline};
