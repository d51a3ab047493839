//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements        | Connects to                   |
//! |------------------|-------------------|-------------------------------|
//! | `hardware`       | PwmPort           | embedded-hal `SetDutyCycle`   |
//! |                  | GpioPort          | embedded-hal `OutputPin`      |
//! | `line_transport` | (drives)          | CommandHandler over a stream  |
//! | `log_sink`       | EventSink         | Serial log output             |

pub mod hardware;
pub mod line_transport;
pub mod log_sink;
