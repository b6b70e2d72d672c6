//! Data types, from the database representation to the API surface.

pub mod api;
pub mod auth;
pub mod db;
pub mod mongodb;
