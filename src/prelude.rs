#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
mod std_items {
    extern crate alloc;
    pub use alloc::collections::VecDeque;
    pub use std::collections::HashMap;
    pub use std::fmt::Debug;
    pub use std::*;
}

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
pub use std_items::*;

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod no_std_items {
    extern crate alloc;
    pub use alloc::fmt::Debug;
    pub use alloc::format;
    pub use alloc::collections::VecDeque;
    pub use alloc::string::{String, ToString};
    pub use alloc::vec;
    pub use alloc::vec::Vec;
    pub use core::*;
    pub use hashbrown::HashMap;
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use no_std_items::*;

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        let value_str = format!($($arg)*);
        #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
        {
            log::info!("[sdo] {}", value_str);
        }
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        {
            defmt::info!("[sdo] {}", defmt::Debug2Format(&value_str));
        }
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        let value_str = format!($($arg)*);
        #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
        {
            log::debug!("[sdo] {}", value_str);
        }
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        {
            defmt::debug!("[sdo] {}", defmt::Debug2Format(&value_str));
        }
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        let value_str = format!($($arg)*);
        #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
        {
            log::warn!("[sdo] {}", value_str);
        }
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        {
            defmt::warn!("[sdo] {}", defmt::Debug2Format(&value_str));
        }
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        let value_str = format!($($arg)*);
        #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
        {
            log::error!("[sdo] {}", value_str);
        }
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        {
            defmt::error!("[sdo] {}", defmt::Debug2Format(&value_str));
        }
    };
}
