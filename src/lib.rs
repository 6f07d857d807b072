// SPDX-License-Identifier: MIT

//! procure-rs - a procurement workflow run as a state machine over a
//! linear graph of steps.

pub mod adk;
pub mod procure;
