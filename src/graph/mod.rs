//! The logical graph builder: `Job`, `Source`/`Operator` specs, and the
//! `Stream` handles used to wire them together (§3, §4.4 of the design).

pub mod component;
pub mod job;
pub mod stream;

pub use component::{ComponentId, Operator, OperatorSpec, Source, SourceSpec};
pub use job::{Job, OperatorHandle};
pub use stream::{NamedStreams, Stream, Streams, WindowedStream};
