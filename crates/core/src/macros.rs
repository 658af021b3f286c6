// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the remedarr crates.
//!
//! - [`simple_display!`] writes the `Display` impl for the small status
//!   enums (corruption states, scan statuses, health error kinds) whose
//!   string form doubles as a database column value.
//! - [`builder!`] generates the `test-support` builders used to construct
//!   configuration entities in tests.

/// `Display` impl mapping enum variants to fixed string literals.
///
/// The produced strings are load-bearing: the storage layer writes them
/// into TEXT columns, so they must stay in lockstep with the enum's
/// matching `parse` function. Unit variants match directly; data-carrying
/// variants use `(..)` to ignore their fields.
///
/// ```ignore
/// crate::simple_display! {
///     CorruptionState {
///         Detected => "detected",
///         VerificationSuccess => "verification_success",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                };
                f.write_str(s)
            }
        }
    };
}

/// Test builder for configuration entities: struct, `Default`, setters,
/// and `build()`, all gated behind `#[cfg(any(test, feature = "test-support"))]`.
///
/// Every field of the target must appear in exactly one group:
/// - `into { field: Type = default }`: setter takes `impl Into<Type>`
/// - `set { field: Type = default }`: setter takes `Type` directly
/// - `option { field: Type = default }`: target field is `Option<Type>`,
///   setter wraps its argument in `Some`
/// - `computed { field: Type = expr }`: no setter; the expression runs at
///   `build()` time
///
/// ```ignore
/// crate::builder! {
///     pub struct ScanPathBuilder => ScanPath {
///         into { local_path: String = "/media/library" }
///         set { max_retries: u32 = DEFAULT_MAX_RETRIES }
///         option { verification_timeout_hours: u32 = None }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $entity:ident {
            $(into {
                $( $into_field:ident : $into_ty:ty = $into_default:expr ),* $(,)?
            })?
            $(set {
                $( $set_field:ident : $set_ty:ty = $set_default:expr ),* $(,)?
            })?
            $(option {
                $( $opt_field:ident : $opt_ty:ty = $opt_default:expr ),* $(,)?
            })?
            $(computed {
                $( $comp_field:ident : $comp_ty:ty = $comp_expr:expr ),* $(,)?
            })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $($( $into_field: $into_ty, )*)?
            $($( $set_field: $set_ty, )*)?
            $($( $opt_field: Option<$opt_ty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                Self {
                    $($( $into_field: $into_default.into(), )*)?
                    $($( $set_field: $set_default, )*)?
                    $($( $opt_field: $opt_default, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $($(
                pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                    self.$into_field = v.into();
                    self
                }
            )*)?

            $($(
                pub fn $set_field(mut self, v: $set_ty) -> Self {
                    self.$set_field = v;
                    self
                }
            )*)?

            $($(
                pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                    self.$opt_field = Some(v.into());
                    self
                }
            )*)?

            pub fn build(self) -> $entity {
                $entity {
                    $($( $into_field: self.$into_field, )*)?
                    $($( $set_field: self.$set_field, )*)?
                    $($( $opt_field: self.$opt_field, )*)?
                    $($( $comp_field: $comp_expr, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $entity {
            /// Builder preloaded with test defaults.
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}
