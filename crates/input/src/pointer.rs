use glam::Vec2;

/// Convert a pointer position in element pixels to normalized device coordinates
/// (`[-1, 1]`, +y up). Returns `None` for an empty element.
pub fn to_ndc(pointer: Vec2, size: Vec2) -> Option<Vec2> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        pointer.x / size.x * 2.0 - 1.0,
        -(pointer.y / size.y) * 2.0 + 1.0,
    ))
}

/// Same as [`to_ndc`] for a pointer given in client coordinates with the element at `origin`.
pub fn client_to_ndc(client: Vec2, origin: Vec2, size: Vec2) -> Option<Vec2> {
    to_ndc(client - origin, size)
}
