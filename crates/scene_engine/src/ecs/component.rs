//! Component trait

/// Marker trait for data that can be attached to an entity.
///
/// `NAME` is the component's tag as shown to tooling (inspector panels,
/// error messages). At most one component of each type exists per entity.
pub trait Component: 'static + Send + Sync {
    /// Display tag of this component type
    const NAME: &'static str;
}
