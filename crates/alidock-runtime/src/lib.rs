//! Container lifecycle management for alidock.
//!
//! [`dock::Dock`] drives a single per-user container through a
//! [`backend::ContainerBackend`], gives SSH access to it and checks whether
//! its image or the client itself are out of date.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod dock;
pub mod init;
pub mod process;
pub mod ssh;
pub mod update;
