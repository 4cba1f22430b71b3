//! Application services: cached queries, mutations and cache administration.

pub mod articles;
pub mod auth;
pub mod cache_admin;
pub mod content;
pub mod error;
pub mod repos;
pub mod wordpress;
