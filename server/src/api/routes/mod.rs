//! API route handlers

pub mod auth;
pub mod cli;
pub mod dashboard;
pub mod health;
pub mod languages;
pub mod projects;
pub mod transfer;
pub mod translations;
pub mod users;
