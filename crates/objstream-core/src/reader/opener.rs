//! Transport seam: opening a ranged read of an object.

use super::TransportError;
use crate::request::ReadRequest;
use std::io::Read;

/// An open body stream plus what the response said about the object.
#[derive(Debug)]
pub struct OpenedObject<S> {
    pub stream: S,
    /// Generation reported by the service, if any.
    pub generation: Option<i64>,
}

/// Opens ranged reads against the object store.
///
/// `pinned_generation` is the generation resolved by an earlier open of the
/// same logical read. An opener must request exactly that generation when it
/// is set (unless the request's object already names one).
pub trait ObjectOpener {
    type Stream: Read;

    fn open(
        &self,
        request: &ReadRequest,
        pinned_generation: Option<i64>,
    ) -> Result<OpenedObject<Self::Stream>, TransportError>;
}

impl<T: ObjectOpener + ?Sized> ObjectOpener for &T {
    type Stream = T::Stream;

    fn open(
        &self,
        request: &ReadRequest,
        pinned_generation: Option<i64>,
    ) -> Result<OpenedObject<Self::Stream>, TransportError> {
        (**self).open(request, pinned_generation)
    }
}
