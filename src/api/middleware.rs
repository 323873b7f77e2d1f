use actix_cors::Cors;

/// The dashboard is served from another origin.
pub fn cors() -> Cors {
    Cors::permissive()
}
