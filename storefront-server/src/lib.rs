//! storefront-server: storefront admin backend
//!
//! Catalog API whose core is the product media consistency engine: it keeps
//! `product_images` rows in PostgreSQL and image blobs in an S3-compatible
//! store consistent across create and update requests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod state;
