// Library entry point for ai-gallery
// Client-side service layer for a hosted-backend artwork gallery

pub mod auth;
pub mod config;
pub mod gateway;
pub mod models;
pub mod optimistic;
pub mod retry;
pub mod services;
pub mod upload;
