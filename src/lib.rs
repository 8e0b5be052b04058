/*
 * Quill - Sandboxed Autonomous Coding Agent
 * File Path: src/lib.rs
 * Responsibility: Shared library modules
 */

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod oracle;
pub mod registry;
pub mod sandbox;
pub mod tools;
