// src/services/mod.rs

pub mod presenter;
pub mod question_bank;
pub mod quiz;
pub mod ranking;
pub mod score_store;
pub mod session_service;
pub mod sheets;
