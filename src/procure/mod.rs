// SPDX-License-Identifier: MIT

pub mod config;
pub mod data;
pub mod services;
pub mod steps;
pub mod workflow;
