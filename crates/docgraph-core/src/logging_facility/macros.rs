//! Canonical logging macros
//!
//! Extra fields after the operation name are passed through to `tracing`
//! unchanged, e.g. `collection = "orders", request_id = %id`.

/// Log the start of an operation
///
/// ```
/// # use docgraph_core::log_op_start;
/// log_op_start!("create");
/// log_op_start!("create", collection = "orders");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = docgraph_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = docgraph_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use docgraph_core::log_op_end;
/// log_op_end!("create", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = docgraph_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = docgraph_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts anything convertible into `DgError`.
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::DgError;
        let dg_err: DgError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = docgraph_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?dg_err.kind(),
            err_code = dg_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::DgError;
        let dg_err: DgError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = docgraph_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?dg_err.kind(),
            err_code = dg_err.code(),
            $($field)*
        );
    }};
}
