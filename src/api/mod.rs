//! API handlers for Bookbank REST endpoints

pub mod borrowers;
pub mod catalog;
pub mod copies;
pub mod health;
pub mod inventory;
pub mod items;
pub mod loans;
pub mod openapi;
