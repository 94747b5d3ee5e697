//! ---
//! lms_section: "03-logging"
//! lms_subsection: "module"
//! lms_type: "source"
//! lms_scope: "code"
//! lms_description: "Structured logging adapters and sinks."
//! lms_version: "v0.0.0-prealpha"
//! lms_owner: "tbd"
//! ---

#[doc(hidden)]
#[macro_export]
macro_rules! __lms_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $level,
            user = ctx.user.unwrap_or(""),
            roles = ctx.roles.unwrap_or(""),
            session = ctx.session.unwrap_or(""),
            route = ctx.route.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with session context.
#[macro_export]
macro_rules! lms_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with session context.
#[macro_export]
macro_rules! lms_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with session context.
#[macro_export]
macro_rules! lms_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with session context.
#[macro_export]
macro_rules! lms_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lms_event!($crate::tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
