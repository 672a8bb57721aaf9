/*!
 * Monitoring
 * Tracing setup and request spans
 */

mod tracer;

pub use tracer::{
    generate_trace_id, init_tracing, span_operation, span_vfs, OperationSpan, VfsSpan,
};
