//! Subscription Gate Bot Library
//!
//! A Telegram bot that only lets users through `/start` once they belong
//! to every configured channel or group.
//!
//! This crate provides the core functionality for:
//! - Reading and rewriting the required chat list in a `.env` file
//! - Checking a user's membership in each required chat
//! - Answering `/start` and the "Check Again" button
//! - Discovering chat ids and invite links for the setup tool

pub mod commands;
pub mod config;
pub mod discovery;
pub mod gate;
pub mod telegram;
