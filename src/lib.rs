//! Group Tally Bot Library
//!
//! A Telegram group bot that counts member activity and posts leaderboards.
//!
//! This crate provides the core functionality for:
//! - Loading and validating the menu and schedule configuration
//! - Counting eligible group messages per user, with repeat suppression
//! - Posting hourly and end-of-day leaderboards on a schedule
//! - Answering reply-keyboard menu buttons and slash commands

pub mod app;
pub mod commands;
pub mod config;
pub mod menu;
pub mod scheduler;
pub mod tally;
pub mod telegram;
