//! Points Ledger Client SDK.
//!
//! This crate provides a client library for back-ends that spend points on
//! behalf of users.
//!
//! # Example
//!
//! ```no_run
//! use points_ledger_client::{ClientOptions, PaidAction, PointsClient};
//!
//! # async fn generate_image() -> Result<String, std::io::Error> { Ok(String::new()) }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PointsClient::with_options(
//!     "http://points-ledger.internal:8080",
//!     "your-service-api-key",
//!     ClientOptions::with_service_name("image-tool"),
//! )?;
//!
//! // Deduct, run the action, and refund automatically if it fails
//! let action = PaidAction::new("user-123", 30, "Image generation");
//! let image = client
//!     .run_paid_action(&action, |_charge| generate_image())
//!     .await?;
//!
//! println!("Generated {image}");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, PointsClient};
pub use error::{ClientError, PaidActionError};
pub use types::*;
