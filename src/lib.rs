pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod mailer;
pub mod membership;
pub mod repository;
pub mod service;
