//! # Transport
//!
//! In-process stand-in for the publish/subscribe middleware.
//!
//! Responsibilities:
//! - Topic subscriptions with KeepLast retention (`Bus`)
//! - One delivery thread per subscription invoking its handler in order
//! - Replay of recorded message streams onto the bus (`ReplaySource`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use transport::{Bus, Qos};
//!
//! let bus = Bus::new();
//! bus.subscribe("/imu0", Qos::keep_last(2000), move |msg: ImuMessage| {
//!     gateway.input_imu(msg.stamp.to_sec(), msg.linear_acceleration.into(), msg.angular_velocity.into());
//! })?;
//! bus.publish("/imu0", imu_msg)?;
//! bus.shutdown();
//! ```

mod bus;
mod error;
mod replay;

pub use bus::{Bus, Qos};
pub use error::{Result, TransportError};
pub use replay::{ReplayMessage, ReplayRecord, ReplaySource, ReplayStats};
