//! Whatsappgo — a bot-runtime adapter for the Whatsappgo WhatsApp gateway.
//!
//! Receives gateway webhooks (form-urlencoded or JSON), decides whether a
//! request belongs to this adapter, normalizes it into canonical incoming
//! messages and turns runtime replies back into authenticated gateway sends.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod types;
pub mod whatsapp;
