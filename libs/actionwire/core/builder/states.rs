/// Type-state markers for the client builder
///
/// Track at compile time which required fields have been set, so `build()`
/// only exists once both the transport URL and the deployment target are
/// known.
use std::marker::PhantomData;

/// Marker trait for URL state
pub trait UrlState {}

/// URL has not been set
pub struct NoUrl;
impl UrlState for NoUrl {}

/// URL has been set
pub struct HasUrl;
impl UrlState for HasUrl {}

/// Marker trait for deployment-target state
pub trait TargetState {}

/// Deployment target has not been set
pub struct NoTarget;
impl TargetState for NoTarget {}

/// Deployment target has been set
pub struct HasTarget;
impl TargetState for HasTarget {}

/// Phantom marker to prevent direct construction
pub struct TypeState<U, T> {
    _url: PhantomData<U>,
    _target: PhantomData<T>,
}

impl<U, T> TypeState<U, T> {
    pub(crate) fn new() -> Self {
        Self {
            _url: PhantomData,
            _target: PhantomData,
        }
    }
}

impl<U, T> Default for TypeState<U, T> {
    fn default() -> Self {
        Self::new()
    }
}
