pub mod api;
pub mod attendance;
pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod grades;
pub mod models;
pub mod preferences;
pub mod realtime;
pub mod schedule;
pub mod school_api;
pub mod search;
pub mod services;
pub mod state;
