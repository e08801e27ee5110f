//! Logging shims. With the `defmt` feature every macro forwards to its `defmt` counterpart,
//! otherwise the arguments are only borrowed so callers compile without a logging backend.
#![no_std]
#![allow(unused_macros)]

#[cfg(feature = "defmt")]
pub use defmt;

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::defmt::trace!($s $(, $x)*)
    };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::defmt::debug!($s $(, $x)*)
    };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::defmt::info!($s $(, $x)*)
    };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::defmt::warn!($s $(, $x)*)
    };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {
        ::defmt::error!($s $(, $x)*)
    };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! unwrap {
    ($($x:tt)*) => {
        ::defmt::unwrap!($($x)*)
    };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! unwrap {
    ($arg:expr) => {
        match $crate::Try::into_result($arg) {
            ::core::result::Result::Ok(t) => t,
            ::core::result::Result::Err(e) => {
                ::core::panic!("unwrap of `{}` failed: {:?}", ::core::stringify!($arg), e);
            }
        }
    };
    ($arg:expr, $($msg:expr),+ $(,)?) => {
        match $crate::Try::into_result($arg) {
            ::core::result::Result::Ok(t) => t,
            ::core::result::Result::Err(e) => {
                ::core::panic!(
                    "unwrap of `{}` failed: {}: {:?}",
                    ::core::stringify!($arg),
                    ::core::format_args!($($msg,)*),
                    e
                );
            }
        }
    };
}

/// Error marker for unwrapping an empty [`Option`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NoneError;

/// Uniform access to the success value of [`Option`] and [`Result`] for `unwrap!`.
pub trait Try {
    type Ok;
    type Error;
    fn into_result(self) -> Result<Self::Ok, Self::Error>;
}

impl<T> Try for Option<T> {
    type Ok = T;
    type Error = NoneError;

    #[inline]
    fn into_result(self) -> Result<T, NoneError> {
        self.ok_or(NoneError)
    }
}

impl<T, E> Try for Result<T, E> {
    type Ok = T;
    type Error = E;

    #[inline]
    fn into_result(self) -> Self {
        self
    }
}

#[cfg(all(test, not(feature = "defmt")))]
mod tests {
    use super::*;

    #[test]
    fn unwrap_passes_through_values() {
        let value: Result<u8, ()> = Ok(7);
        assert_eq!(unwrap!(value), 7);
        assert_eq!(unwrap!(Some(3u16), "missing {}", "value"), 3);
    }

    #[test]
    #[should_panic]
    fn unwrap_panics_on_none() {
        let value: Option<u8> = None;
        let _ = unwrap!(value);
    }

    #[test]
    fn log_macros_accept_arguments() {
        let reading = 42u32;
        info!("reading {}", reading);
        warn!("reading {} of {}", reading, 100u32,);
        error!("plain message");
        debug!("{:?}", reading);
        trace!("{}", reading);
    }
}
