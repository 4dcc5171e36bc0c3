//! Record declaration macros.
//!
//! This module provides declarative macros that generate [`Record`] impls for
//! plain structs. The macros expand at compile time, so the column order of a
//! record is fixed by its declaration and checked by the compiler against the
//! struct's field types.
//!
//! [`Record`]: crate::db::Record

/// Implement [`Record`](crate::db::Record) for a struct by listing its fields
/// in column order.
///
/// Fields are scanned depth-first in the order listed. A field whose type is
/// itself a record is flattened into its own columns.
///
/// # Example
///
/// ```
/// use data_layer::impl_record;
///
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// impl_record!(Point { x: f64, y: f64 });
///
/// struct Place {
///     id: i64,
///     name: String,
///     location: Point,
/// }
///
/// impl_record!(Place {
///     id: i64,
///     name: String,
///     location: Point,
/// });
///
/// use data_layer::db::Record;
/// assert_eq!(Place::WIDTH, 4);
/// ```
#[macro_export]
macro_rules! impl_record {
    ($name:ident { $($field:ident : $ty:ty),+ $(,)? }) => {
        impl $crate::db::Record for $name {
            const WIDTH: usize = 0 $(+ <$ty as $crate::db::Record>::WIDTH)+;

            fn describe(path: &str, targets: &mut ::std::vec::Vec<$crate::db::ScanTarget>) {
                $(
                    <$ty as $crate::db::Record>::describe(
                        &$crate::db::mapper::join_path(path, stringify!($field)),
                        targets,
                    );
                )+
            }

            fn scan(
                row: &$crate::db::PgRow,
                cursor: &mut usize,
            ) -> $crate::db::ScanResult<Self> {
                ::std::result::Result::Ok($name {
                    $( $field: <$ty as $crate::db::Record>::scan(row, cursor)?, )+
                })
            }
        }
    };
}

pub use impl_record;
