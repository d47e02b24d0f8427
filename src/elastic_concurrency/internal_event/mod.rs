//! Metrics and log events emitted by the limiter.
//!
//! Each event is registered once, when its owner is constructed, so the metric
//! handles are resolved against the installed recorder a single time and the
//! hot path only touches already-registered handles.

mod elastic_concurrency;

pub use elastic_concurrency::*;

/// Declares an event holding pre-registered metric handles.
///
/// ```ignore
/// registered_event! {
///     MyEvent => {
///         hits: Counter = counter!("my_hits_total"),
///     }
///
///     fn emit(&self, count: u64) {
///         self.hits.increment(count);
///     }
/// }
/// ```
#[macro_export]
macro_rules! registered_event {
    (
        $event:ident => {
            $( $field:ident: $type:ty = $value:expr, )*
        }

        fn emit(&$slf:ident, $data_name:ident: $data:ty) $emit_body:block
    ) => {
        #[derive(Clone)]
        pub struct $event {
            $( $field: $type, )*
        }

        impl $event {
            pub fn register() -> Self {
                Self {
                    $( $field: $value, )*
                }
            }

            pub fn emit(&$slf, $data_name: $data) $emit_body
        }
    };
}
