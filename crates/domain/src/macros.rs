//! Macro for implementing Display and FromStr for state enums
//!
//! Alert states, stage kinds and mail states are persisted as lowercase
//! strings. This macro keeps both directions of that mapping in one place.
//!
//! # Example
//!
//! ```rust
//! use transitdesk_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ClearanceStatus {
//!     Declared,
//!     Released,
//! }
//!
//! impl_domain_status_conversions!(ClearanceStatus {
//!     Declared => "declared",
//!     Released => "released",
//! });
//!
//! assert_eq!(ClearanceStatus::Released.to_string(), "released");
//! assert_eq!("DECLARED".parse::<ClearanceStatus>(), Ok(ClearanceStatus::Declared));
//! ```

/// Implements Display and FromStr traits for state enums
///
/// - Display writes the mapped string
/// - FromStr parses it back, ignoring case, and names the enum in the error
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Persisted string form of this value.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
