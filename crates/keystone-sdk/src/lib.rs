//! Chat platform client for Keystone.
//!
//! Covers the slice of the management API the provisioning engine needs:
//! roles, channels, permission overwrites, members, DMs and slash-command
//! interactions, plus a gateway connection to receive those interactions.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use keystone_sdk::{PlatformClient, builders::SlashCommandBuilder};
//!
//! #[tokio::main]
//! async fn main() -> keystone_sdk::Result<()> {
//!     let mut client = PlatformClient::new("Bot mytoken", None, None)?;
//!
//!     client.command(
//!         SlashCommandBuilder::new()
//!             .name("ping")
//!             .description("Replies with Pong!")
//!             .build(),
//!         |_interaction| Box::pin(async { println!("Pong!") }),
//!     );
//!
//!     client.login("your-app-id").await?;
//!     tokio::signal::ctrl_c().await.ok();
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod client;
pub mod error;
pub mod gateway;
pub mod rest;
pub mod types;

pub use client::PlatformClient;
pub use error::{PlatformError, Result};
pub use gateway::GatewayClient;
pub use rest::RestClient;
pub use types::*;
