// SPDX-License-Identifier: MIT

pub mod graph;
pub mod pipeline;
pub mod state;
pub mod step;
