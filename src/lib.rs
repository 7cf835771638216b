// Copyright 2023 Remi Bernotavicius

//! Recipes, ratings, meal planning and per-user settings over a SQLite database.
//!
//! Every operation is a plain function taking `&mut database::Connection` and runs as one
//! transaction.

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod fixtures;
pub mod ingredients;
pub mod meals;
pub mod recipes;
pub mod settings;
pub mod users;

pub use error::{Error, Result};
