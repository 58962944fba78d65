// smsmerge Gateway - MessageBird delivery client
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # smsmerge Gateway - MessageBird delivery client
//!
//! Implements [`smsmerge::DeliveryGateway`] on top of the MessageBird REST
//! API, so the aggregation engine can hand merged payloads straight to the
//! SMS provider.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use smsmerge::{Engine, EngineConfig};
//! use smsmerge_gateway::{GatewayConfig, MessageBirdClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MessageBirdClient::new(GatewayConfig::with_access_key("live_xxx"))?;
//! let engine = Engine::start(EngineConfig::default(), Arc::new(client))?;
//! # engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error mapping
//!
//! | [`GatewayError`]            | [`smsmerge::DeliveryError`] |
//! |-----------------------------|-----------------------------|
//! | `Api { status, errors }`    | `Rejected { status, .. }`   |
//! | `Http`, `InvalidConfig`     | `Transport`                 |
//! | `Decode`                    | `InvalidResponse`           |

pub mod client;
pub mod config;
pub mod error;

pub use client::{MessageBirdClient, RecipientSummary, SmsMessage};
pub use config::{GatewayConfig, DEFAULT_BASE_URL};
pub use error::{ApiError, GatewayError, Result};
