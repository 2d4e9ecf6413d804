//! Requeue-timing helpers covering this operator's fixed requeue intervals
//! (§4.2-§4.6). The framework (`kube::runtime::Controller`) already applies
//! exponential back-off on returned errors, so this module only covers the
//! *soft*, status-driven requeue timings the reconcilers choose explicitly.

use std::time::Duration;

use kube::runtime::controller::Action;

use crate::constants::{ERROR_REQUEUE_SECS, PARENT_MISSING_REQUEUE_SECS};

pub fn requeue_after(seconds: u64) -> Action {
    Action::requeue(Duration::from_secs(seconds))
}

pub fn requeue_error() -> Action {
    requeue_after(ERROR_REQUEUE_SECS)
}

pub fn requeue_parent_missing() -> Action {
    requeue_after(PARENT_MISSING_REQUEUE_SECS)
}

pub fn requeue_interval(seconds: u32) -> Action {
    requeue_after(u64::from(seconds))
}

/// `error_policy` shared by every controller: on an unhandled reconcile
/// error, requeue with the fixed soft back-off rather than letting it bubble
/// silently — actual incident response relies on the error being logged by
/// the controller-runtime's own tracing span.
pub fn error_policy<T, C>(_obj: std::sync::Arc<T>, _err: &impl std::error::Error, _ctx: std::sync::Arc<C>) -> Action {
    requeue_error()
}

pub fn is_retryable_kube_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(ae) => ae.code == 409 || ae.code >= 500,
        // Anything else (transport, serde, auth refresh) is treated as
        // retryable by the controller-runtime's own back-off already.
        _ => true,
    }
}
