//! Reference device-window implementations for the windows `spec.md` §6
//! names as external collaborators: serial, VGA, keyboard and uptime.
//! None imply a terminal or graphics backend; the front end supplies the
//! sink, queue and clock each one needs.

pub mod keyboard;
pub mod serial;
pub mod uptime;
pub mod vga;

pub use keyboard::{KeyEvent, KeyboardPort};
pub use serial::{SerialPort, SerialSink, Stdout};
pub use uptime::{Clock, UptimePort};
pub use vga::VgaWindow;
